use serde::Serialize;
use std::fmt::Write;

use crate::bots::{BotSection, LocalizedBotDetails, UiStrings};
use crate::installers::{InstallerAsset, InstallerGroup, InstallerTree};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// 输出格式化器
pub struct OutputFormatter;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| format!("JSON 序列化失败: {e}"))
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn write_installer(output: &mut String, asset: &InstallerAsset, indent: usize) {
    let pad = "  ".repeat(indent);
    let _ = writeln!(
        output,
        "{pad}{} [{}] {} ({})",
        asset.name,
        asset.platform,
        asset.filename,
        format_size(asset.size)
    );
    let _ = writeln!(output, "{pad}  {}", asset.download_url);
    if let Some(details) = asset.details() {
        if let Some(version) = details.version {
            let _ = writeln!(output, "{pad}  version: {version}");
        }
        if let Some(description) = details.description {
            let _ = writeln!(output, "{pad}  {description}");
        }
    }
}

fn write_group(output: &mut String, group: &InstallerGroup, indent: usize) {
    let pad = "  ".repeat(indent);
    let _ = writeln!(output, "{pad}{}/ ({})", group.name, group.total_installers());
    for asset in &group.installers {
        write_installer(output, asset, indent + 1);
    }
    for child in &group.children {
        write_group(output, child, indent + 1);
    }
}

impl OutputFormatter {
    /// 格式化安装包列表
    pub fn format_installers(
        &self,
        installers: &[InstallerAsset],
        ui: &UiStrings,
        format: OutputFormat,
    ) -> Result<String, String> {
        match format {
            OutputFormat::Text => {
                if installers.is_empty() {
                    return Ok(format!("{}\n", ui.no_installers_message));
                }
                let mut output = String::new();
                for asset in installers {
                    write_installer(&mut output, asset, 0);
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(installers),
        }
    }

    /// 格式化分组树
    pub fn format_tree(&self, tree: &InstallerTree, ui: &UiStrings, format: OutputFormat) -> Result<String, String> {
        match format {
            OutputFormat::Text => {
                if tree.is_empty() {
                    return Ok(format!("{}\n", ui.no_installers_message));
                }
                let mut output = String::new();
                for asset in &tree.installers {
                    write_installer(&mut output, asset, 0);
                }
                for group in &tree.groups {
                    write_group(&mut output, group, 0);
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(tree),
        }
    }

    /// 格式化 bot 分组
    pub fn format_sections(&self, sections: &[BotSection], ui: &UiStrings, format: OutputFormat) -> Result<String, String> {
        match format {
            OutputFormat::Text => {
                if sections.is_empty() {
                    return Ok(format!("{}\n", ui.generic_error_message));
                }
                let mut output = String::new();
                for section in sections {
                    let _ = writeln!(output, "{} [{}]", section.title, section.language_label);
                    if let Some(summary) = &section.summary {
                        let _ = writeln!(output, "  {summary}");
                    }
                    for bot in &section.bots {
                        let _ = writeln!(output, "  - {}: {}", bot.display_name, bot.short_description);
                    }
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(sections),
        }
    }

    /// 格式化 bot 详情
    pub fn format_bot(&self, bot: &LocalizedBotDetails, ui: &UiStrings, format: OutputFormat) -> Result<String, String> {
        match format {
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "{} ({}/{})", bot.display_name, bot.language, bot.bot_name);
                let _ = writeln!(output, "{}", bot.description);
                let start_command = if bot.start_command.is_empty() {
                    ui.no_start_command_fallback
                } else {
                    bot.start_command.as_str()
                };
                let _ = writeln!(output, "{}: {start_command}", ui.start_command_label);
                if let Some(source) = &bot.source_url {
                    let _ = writeln!(output, "{}: {source}", ui.view_source_label);
                }
                for (action, target) in &bot.actions {
                    let _ = writeln!(output, "{action}: {target}");
                }
                Ok(output)
            }
            OutputFormat::Json => to_json(bot),
        }
    }

    /// 格式化成功信息
    pub fn format_success(&self, message: &str) -> String {
        format!("{message}\n")
    }
}

/// 默认输出格式化器实例
pub static FORMATTER: OutputFormatter = OutputFormatter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::Platform;
    use pretty_assertions::assert_eq;

    fn asset() -> InstallerAsset {
        InstallerAsset {
            name: "Tool".to_string(),
            filename: "tool.exe".to_string(),
            path: "windows/tool.exe".to_string(),
            relative_path: "windows/tool.exe".to_string(),
            directories: vec!["windows".to_string()],
            download_url: "https://example.org/installers/windows/tool.exe".to_string(),
            size: 2048,
            platform: Platform::Windows,
            content_type: None,
            metadata: None,
        }
    }

    #[test]
    fn test_empty_catalog_message() {
        let output = FORMATTER
            .format_installers(&[], &UiStrings::ENGLISH, OutputFormat::Text)
            .unwrap();
        assert_eq!(output, "No installers available.\n");
        let output = FORMATTER
            .format_tree(&InstallerTree::default(), &UiStrings::ITALIAN, OutputFormat::Text)
            .unwrap();
        assert_eq!(output, "Nessun installer disponibile.\n");
    }

    #[test]
    fn test_text_installer_line() {
        let output = FORMATTER
            .format_installers(&[asset()], &UiStrings::ENGLISH, OutputFormat::Text)
            .unwrap();
        assert_eq!(
            output,
            "Tool [Windows] tool.exe (2.0 KB)\n  https://example.org/installers/windows/tool.exe\n"
        );
    }

    #[test]
    fn test_json_uses_camel_case() {
        let output = FORMATTER
            .format_installers(&[asset()], &UiStrings::ENGLISH, OutputFormat::Json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["relativePath"], "windows/tool.exe");
        assert_eq!(value[0]["platform"], "Windows");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}

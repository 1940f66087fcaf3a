use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::bots::{BotService, BotSummary, UiStrings};
use crate::cli::commands::*;
use crate::cli::output::{OutputFormat, FORMATTER};
use crate::infrastructure::config::CatalogConfig;
use crate::infrastructure::remote::HttpClient;
use crate::installers::generator::{generate_metadata, read_version, GeneratorOptions};
use crate::installers::InstallerCatalog;

const DEFAULT_PUBSPEC: &str = "pubspec.yaml";

/// 命令处理器
pub struct CommandHandler {
    config: Arc<CatalogConfig>,
}

impl CommandHandler {
    /// 按 默认值 → 配置文件 → 环境变量 → 命令行 的顺序构造配置
    pub fn new(global: &GlobalArgs) -> Result<Self, String> {
        let mut config = CatalogConfig::load(global.config.as_deref()).map_err(|e| e.to_string())?;
        config.apply_overrides(global.overrides());
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// 处理命令
    pub async fn handle_command(&self, command: Commands) -> Result<(), String> {
        match command {
            Commands::Installers { action } => self.handle_installer_command(action).await,
            Commands::Bots { action } => self.handle_bot_command(action).await,
        }
    }

    /// 处理安装包命令
    async fn handle_installer_command(&self, action: InstallerCommands) -> Result<(), String> {
        match action {
            InstallerCommands::List { json, tree, lang } => {
                let catalog = InstallerCatalog::from_config(Arc::clone(&self.config)).map_err(|e| e.to_string())?;
                let ui = UiStrings::for_language(lang.as_deref());
                let format = OutputFormat::from_json_flag(json);
                let output = if tree {
                    FORMATTER.format_tree(&catalog.list_installer_tree().await, &ui, format)?
                } else {
                    FORMATTER.format_installers(&catalog.list_installer_assets().await, &ui, format)?
                };
                print!("{output}");
            }
            InstallerCommands::Generate {
                dir,
                release_version,
                pubspec,
                repository,
                summary_name,
            } => {
                let version = resolve_version(release_version, pubspec)?;
                let mut options = GeneratorOptions::new(version, repository.as_deref());
                if let Some(name) = summary_name {
                    options.summary_name = name;
                }
                let generated = generate_metadata(&dir, &options).map_err(|e| e.to_string())?;
                print!(
                    "{}",
                    FORMATTER.format_success(&format!(
                        "Generated metadata for {} installer(s) in {}",
                        generated.len(),
                        dir.display()
                    ))
                );
            }
        }
        Ok(())
    }

    /// 处理 bot 命令
    async fn handle_bot_command(&self, action: BotCommands) -> Result<(), String> {
        let service = BotService::from_config(Arc::clone(&self.config)).map_err(|e| e.to_string())?;
        match action {
            BotCommands::List { lang, json } => {
                let ui = UiStrings::for_language(lang.as_deref());
                let sections = service
                    .list_sections(lang.as_deref())
                    .await
                    .map_err(|e| format!("{}: {e}", ui.generic_error_title))?;
                print!(
                    "{}",
                    FORMATTER.format_sections(&sections, &ui, OutputFormat::from_json_flag(json))?
                );
            }
            BotCommands::Show {
                language,
                bot,
                lang,
                json,
            } => {
                let ui = UiStrings::for_language(lang.as_deref());
                let details = service
                    .get_bot_details(&language, &bot, lang.as_deref())
                    .await
                    .map_err(|e| e.to_string())?;
                print!(
                    "{}",
                    FORMATTER.format_bot(&details, &ui, OutputFormat::from_json_flag(json))?
                );
            }
            BotCommands::Download {
                language,
                bot,
                output,
            } => {
                let summary = match service.get_bots_config().await {
                    Ok(config) => config.find_bot(&language, &bot).cloned(),
                    Err(e) => {
                        info!("无法读取 bots.json，使用默认压缩包名: {e}");
                        None
                    }
                }
                .unwrap_or_else(|| BotSummary {
                    bot_name: bot.clone(),
                    path: None,
                    description: None,
                    short_description: None,
                    start_command: None,
                });

                let url = service
                    .bot_download_url(&language, &summary)
                    .map_err(|e| e.to_string())?;
                let http = HttpClient::with_timeout(self.config.request_timeout_secs).map_err(|e| e.to_string())?;
                let bytes = service
                    .download_bot(&http, &language, &summary)
                    .await
                    .map_err(|e| e.to_string())?;

                let target = output.unwrap_or_else(|| default_download_path(url.path()));
                fs::write(&target, &bytes).map_err(|e| format!("无法写入 {}: {e}", target.display()))?;
                print!(
                    "{}",
                    FORMATTER.format_success(&format!(
                        "Downloaded {} ({} bytes) to {}",
                        summary.bot_name,
                        bytes.len(),
                        target.display()
                    ))
                );
            }
        }
        Ok(())
    }
}

/// 显式版本优先，否则读取 pubspec.yaml
fn resolve_version(version: Option<String>, pubspec: Option<PathBuf>) -> Result<String, String> {
    if let Some(version) = version.filter(|v| !v.trim().is_empty()) {
        return Ok(version.trim().to_string());
    }
    let pubspec = pubspec.unwrap_or_else(|| PathBuf::from(DEFAULT_PUBSPEC));
    read_version(&pubspec).map_err(|e| e.to_string())
}

/// 下载地址最后一段（已解码）作为默认文件名
fn default_download_path(url_path: &str) -> PathBuf {
    let name = url_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("bot.zip");
    let decoded = urlencoding::decode(name)
        .map(|n| n.into_owned())
        .unwrap_or_else(|_| name.to_string());
    Path::new(&decoded)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bot.zip"))
}

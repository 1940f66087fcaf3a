use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::infrastructure::config::ConfigOverrides;

/// scriptagher CLI 应用程序
#[derive(Parser)]
#[command(name = "scriptagher")]
#[command(about = "Bot 与安装包目录浏览工具", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 全局参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// 配置文件路径（默认 ~/.scriptagher/config.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// GitHub 仓库 owner
    #[arg(long, global = true)]
    pub owner: Option<String>,
    /// GitHub 仓库名
    #[arg(long, global = true)]
    pub repo: Option<String>,
    /// 安装包所在分支
    #[arg(long, global = true)]
    pub branch: Option<String>,
    /// 安装包公开地址
    #[arg(long, global = true)]
    pub installers_base_url: Option<String>,
    /// 站点根地址
    #[arg(long, global = true)]
    pub site_base_url: Option<String>,
    /// 日志级别（trace/debug/info/warn/error）
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    /// 命令行覆盖项
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            github_owner: self.owner.clone(),
            github_repo: self.repo.clone(),
            installers_branch: self.branch.clone(),
            installers_base_url: self.installers_base_url.clone(),
            site_base_url: self.site_base_url.clone(),
        }
    }
}

/// 顶级命令
#[derive(Subcommand)]
pub enum Commands {
    /// 安装包目录
    Installers {
        #[command(subcommand)]
        action: InstallerCommands,
    },
    /// Bot 目录
    Bots {
        #[command(subcommand)]
        action: BotCommands,
    },
}

/// 安装包命令
#[derive(Subcommand)]
pub enum InstallerCommands {
    /// 列出全部安装包
    List {
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
        /// 按目录分组显示
        #[arg(long)]
        tree: bool,
        /// 界面语言
        #[arg(long)]
        lang: Option<String>,
    },
    /// 为本地安装包目录生成元数据
    Generate {
        /// 安装包目录
        #[arg(long)]
        dir: PathBuf,
        /// 版本号
        #[arg(long = "version", conflicts_with = "pubspec")]
        release_version: Option<String>,
        /// 从 pubspec.yaml 读取版本号
        #[arg(long)]
        pubspec: Option<PathBuf>,
        /// 仓库（owner/repo），用于拼接下载地址
        #[arg(long)]
        repository: Option<String>,
        /// 汇总文件名
        #[arg(long)]
        summary_name: Option<String>,
    },
}

/// Bot 命令
#[derive(Subcommand)]
pub enum BotCommands {
    /// 按语言分组列出 bot
    List {
        /// 界面语言
        #[arg(long)]
        lang: Option<String>,
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 显示 bot 详情
    Show {
        /// 编程语言分组
        language: String,
        /// bot 名称
        bot: String,
        /// 界面语言
        #[arg(long)]
        lang: Option<String>,
        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 下载 bot 压缩包
    Download {
        /// 编程语言分组
        language: String,
        /// bot 名称
        bot: String,
        /// 输出文件路径
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scriptagher",
            "installers",
            "list",
            "--json",
            "--owner",
            "octo",
            "--repo",
            "tools",
        ])
        .unwrap();
        let overrides = cli.global.overrides();
        assert_eq!(overrides.github_owner.as_deref(), Some("octo"));
        assert_eq!(overrides.github_repo.as_deref(), Some("tools"));
        assert!(matches!(
            cli.command,
            Commands::Installers {
                action: InstallerCommands::List { json: true, tree: false, .. }
            }
        ));
    }

    #[test]
    fn test_version_conflicts_with_pubspec() {
        let result = Cli::try_parse_from([
            "scriptagher",
            "installers",
            "generate",
            "--dir",
            "out",
            "--version",
            "1.0.0",
            "--pubspec",
            "pubspec.yaml",
        ]);
        assert!(result.is_err());
    }
}

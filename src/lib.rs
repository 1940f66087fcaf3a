// 核心模块
pub mod bots;
pub mod cli;
pub mod core;
pub mod error;
pub mod infrastructure;
pub mod installers;

// 重新导出常用类型
pub use bots::{BotService, LocalizedBotDetails, UiStrings};
pub use error::*;
pub use infrastructure::config::{CatalogConfig, ConfigOverrides};
pub use installers::{InstallerAsset, InstallerCatalog, InstallerGroup, InstallerTree, Platform};
// 使用命名空间导入常量
pub use crate::core::constants as app_constants;

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::core::constants::defaults::{DEFAULT_CONFIG_DIR, INSTALLERS_BRANCH, INSTALLERS_PATH};
use crate::core::constants::manifest::MANIFEST_CANDIDATES;
use crate::core::constants::network::{DEFAULT_TIMEOUT_SECS, GITHUB_API_BASE_URL};
use crate::error::{AppError, AppResult};

/// 目录浏览配置
///
/// 启动时构造一次，之后以引用或 `Arc` 传给目录服务，不再读取环境变量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub installers_branch: String,
    pub installers_path: String,
    pub installers_base_url: Option<String>,
    pub site_base_url: Option<String>,
    pub api_base_url: String,
    pub manifest_candidates: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            github_owner: None,
            github_repo: None,
            installers_branch: INSTALLERS_BRANCH.to_string(),
            installers_path: INSTALLERS_PATH.to_string(),
            installers_base_url: None,
            site_base_url: None,
            api_base_url: GITHUB_API_BASE_URL.to_string(),
            manifest_candidates: MANIFEST_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// 命令行参数覆盖项，优先级最高
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub installers_branch: Option<String>,
    pub installers_base_url: Option<String>,
    pub site_base_url: Option<String>,
}

impl CatalogConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载
    ///
    /// 显式指定的配置文件必须存在；默认位置的配置文件可以缺失。
    pub fn load(explicit_path: Option<&Path>) -> AppResult<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = get_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "配置文件不存在，使用默认配置");
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析，`${VAR}` 形式的值从环境变量解析
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve_placeholders();
        Ok(config)
    }

    fn resolve_placeholders(&mut self) {
        for slot in [
            &mut self.github_owner,
            &mut self.github_repo,
            &mut self.installers_base_url,
            &mut self.site_base_url,
        ] {
            if let Some(value) = slot.as_mut() {
                *value = resolve_env_var(value);
            }
        }
        for value in [
            &mut self.installers_branch,
            &mut self.installers_path,
            &mut self.api_base_url,
        ] {
            *value = resolve_env_var(value);
        }
    }

    /// 应用进程环境变量
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| env::var(key).ok());
    }

    /// 应用环境变量；每个字段取第一个非空的变量
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        if let Some(owner) = first(&["SCRIPTAGHER_GITHUB_OWNER", "GITHUB_OWNER"]) {
            self.github_owner = Some(owner);
        }
        if let Some(repo) = first(&["SCRIPTAGHER_GITHUB_REPO", "GITHUB_REPO"]) {
            self.github_repo = Some(repo);
        }
        if let Some(branch) = first(&["SCRIPTAGHER_INSTALLERS_BRANCH", "GITHUB_INSTALLERS_BRANCH"]) {
            self.installers_branch = branch;
        }
        if let Some(path) = first(&["SCRIPTAGHER_INSTALLERS_PATH"]) {
            self.installers_path = path;
        }
        if let Some(url) = first(&["SCRIPTAGHER_INSTALLERS_BASE_URL", "INSTALLERS_BASE_URL"]) {
            self.installers_base_url = Some(url);
        }
        if let Some(url) = first(&["SCRIPTAGHER_SITE_BASE_URL"]) {
            self.site_base_url = Some(url);
        }
        if let Some(url) = first(&["SCRIPTAGHER_API_BASE_URL"]) {
            self.api_base_url = url;
        }
    }

    /// 应用命令行参数
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if overrides.github_owner.is_some() {
            self.github_owner = overrides.github_owner;
        }
        if overrides.github_repo.is_some() {
            self.github_repo = overrides.github_repo;
        }
        if let Some(branch) = overrides.installers_branch {
            self.installers_branch = branch;
        }
        if overrides.installers_base_url.is_some() {
            self.installers_base_url = overrides.installers_base_url;
        }
        if overrides.site_base_url.is_some() {
            self.site_base_url = overrides.site_base_url;
        }
    }

    /// 仓库 owner 与 repo，两者都配置时才返回
    pub fn repository(&self) -> Option<(&str, &str)> {
        let owner = self.github_owner.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let repo = self.github_repo.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((owner, repo))
    }

    /// 站点根地址（bots 目录所在），以 `/` 结尾
    pub fn site_base_url(&self) -> Option<Url> {
        match &self.site_base_url {
            Some(explicit) => parse_base_url(explicit),
            None => {
                let (owner, repo) = self.repository()?;
                parse_base_url(&format!("https://{owner}.github.io/{repo}/"))
            }
        }
    }

    /// 安装包公开地址，以 `/` 结尾
    pub fn installers_base_url(&self) -> Option<Url> {
        match &self.installers_base_url {
            Some(explicit) => parse_base_url(explicit),
            None => {
                let path = self.installers_path.trim_matches('/');
                let site = self.site_base_url()?;
                match site.join(&format!("{path}/")) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!(path, "无法拼接安装包地址: {e}");
                        None
                    }
                }
            }
        }
    }
}

fn parse_base_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    match Url::parse(&with_slash) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(url = trimmed, "忽略无效的基础地址: {e}");
            None
        }
    }
}

/// 解析环境变量引用（如 ${VAR_NAME}）
pub fn resolve_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// 获取配置文件路径
pub fn get_config_path() -> AppResult<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// 获取配置目录
pub fn get_config_dir() -> AppResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| AppError::config("无法获取用户主目录"))?;
    Ok(home_dir.join(DEFAULT_CONFIG_DIR))
}

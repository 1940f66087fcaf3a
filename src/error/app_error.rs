use std::io;
use thiserror::Error;

/// 应用程序错误类型
///
/// 所有载荷都是字符串，保证 `Clone`：同一个进行中的请求结果需要分发给多个等待者。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("网络错误: {message}")]
    Network { message: String },

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("未找到请求的资源: {resource}")]
    NotFound { resource: String },

    #[error("序列化错误: {message}")]
    Serialization { message: String },

    #[error("解码错误: {message}")]
    Decode { message: String },

    #[error("配置错误: {message}")]
    Config { message: String },

    #[error("IO 错误: {message}")]
    Io { message: String },

    #[error("无效的 URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// 应用程序 Result 类型
pub type AppResult<T> = Result<T, AppError>;

/// 便捷的错误创建函数
impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_url(url: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 是否为“资源不存在”类错误（清单候选缺失、元数据文件缺失）
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. } | AppError::HttpStatus { status: 404, .. }
        )
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AppError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => AppError::Network {
                message: err.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::InvalidUrl {
            url: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

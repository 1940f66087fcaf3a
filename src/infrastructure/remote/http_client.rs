use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::core::constants::network::{DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::error::{AppError, AppResult};

/// 通用 JSON GET
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> AppResult<Value>;
}

/// 下载进度回调：(已下载, 总大小)
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// HTTP 客户端包装器
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// 创建新的 HTTP 客户端
    pub fn new() -> AppResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// 创建带自定义超时的 HTTP 客户端
    pub fn with_timeout(timeout_secs: u64) -> AppResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 底层 reqwest 客户端，供需要自定义请求头的调用方使用
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET 请求，非 2xx 状态转换为错误
    pub async fn get(&self, url: &str) -> AppResult<Response> {
        let response = self.client.get(url).send().await?;
        ensure_success(response, url)
    }

    /// GET 请求并返回文本
    pub async fn get_text(&self, url: &str) -> AppResult<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// GET 请求并返回 JSON
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let text = self.get_text(url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 下载文件
    pub async fn download(
        &self,
        url: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> AppResult<Vec<u8>> {
        let response = self.get(url).await?;
        let total_size = response.content_length().unwrap_or(0);

        let mut data = Vec::new();
        let mut downloaded = 0u64;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            data.extend_from_slice(&chunk);

            if let Some(ref callback) = progress_callback {
                callback(downloaded, total_size);
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl JsonFetcher for HttpClient {
    async fn fetch_json(&self, url: &str) -> AppResult<Value> {
        self.get_json(url).await
    }
}

/// 检查响应状态
pub(crate) fn ensure_success(response: Response, url: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error = NetworkError::from_status(status);
    debug!(url, %status, "请求失败: {error}");
    Err(error.into_app_error(status, url))
}

/// 网络错误类型
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("HTTP error: {0}")]
    Status(StatusCode),
}

impl NetworkError {
    /// 从 HTTP 状态码创建错误
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::INTERNAL_SERVER_ERROR => {
                Self::ServerError("Internal server error".to_string())
            }
            StatusCode::SERVICE_UNAVAILABLE => Self::ServerError("Service unavailable".to_string()),
            _ => Self::Status(status),
        }
    }

    pub fn into_app_error(self, status: StatusCode, url: &str) -> AppError {
        match self {
            Self::NotFound => AppError::not_found(url),
            _ => AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            },
        }
    }
}

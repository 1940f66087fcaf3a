use async_trait::async_trait;
use base64::Engine;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;

use super::http_client::{ensure_success, HttpClient};
use crate::core::constants::network::GITHUB_ACCEPT;
use crate::error::{AppError, AppResult};

/// 目录列表中的条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// 托管 API 目录列表的单个条目
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl DirectoryEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// 文件内容接口的返回体（base64 编码）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileContent {
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl FileContent {
    /// 解码内容；API 返回的 base64 每 60 个字符换行
    pub fn decode(&self) -> AppResult<Vec<u8>> {
        match self.encoding.as_deref() {
            None | Some("base64") => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
            }
            Some(_) => Ok(self.content.clone().into_bytes()),
        }
    }

    /// 解码并解析为 JSON
    pub fn decode_json(&self) -> AppResult<Value> {
        let bytes = self.decode()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// 代码托管仓库的只读访问
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// 列出目录（单层）
    async fn list_directory(&self, path: &str, git_ref: &str) -> AppResult<Vec<DirectoryEntry>>;

    /// 读取文件内容
    async fn fetch_file_content(&self, path: &str, git_ref: &str) -> AppResult<FileContent>;
}

/// 拼接 contents API 地址，路径逐段编码
pub fn contents_api_url(api_base_url: &str, owner: &str, repo: &str, path: &str, git_ref: &str) -> String {
    let encoded_path = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/repos/{}/{}/contents/{}?ref={}",
        api_base_url.trim_end_matches('/'),
        urlencoding::encode(owner),
        urlencoding::encode(repo),
        encoded_path,
        urlencoding::encode(git_ref)
    )
}

/// GitHub contents API 客户端
pub struct GitHubContentsClient {
    http: HttpClient,
    api_base_url: String,
    owner: String,
    repo: String,
}

impl GitHubContentsClient {
    /// 创建新的 GitHub contents 客户端
    pub fn new(
        http: HttpClient,
        api_base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    fn contents_url(&self, path: &str, git_ref: &str) -> String {
        contents_api_url(&self.api_base_url, &self.owner, &self.repo, path, git_ref)
    }

    async fn get_contents(&self, path: &str, git_ref: &str) -> AppResult<Value> {
        let url = self.contents_url(path, git_ref);
        let response = self
            .http
            .inner()
            .get(&url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;
        let response = ensure_success(response, &url)?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RepositoryClient for GitHubContentsClient {
    async fn list_directory(&self, path: &str, git_ref: &str) -> AppResult<Vec<DirectoryEntry>> {
        match self.get_contents(path, git_ref).await? {
            // 路径指向文件时 API 返回单个对象
            single @ Value::Object(_) => Ok(vec![serde_json::from_value(single)?]),
            listing => Ok(serde_json::from_value(listing)?),
        }
    }

    async fn fetch_file_content(&self, path: &str, git_ref: &str) -> AppResult<FileContent> {
        match self.get_contents(path, git_ref).await? {
            Value::Array(_) => Err(AppError::Decode {
                message: format!("{path} 是目录而不是文件"),
            }),
            value => Ok(serde_json::from_value(value)?),
        }
    }
}

//! 测试用的内存实现：记录调用次数，便于断言去重与回退行为

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::github::{DirectoryEntry, EntryKind, FileContent, RepositoryClient};
use super::http_client::JsonFetcher;
use crate::error::{AppError, AppResult};

/// 按 URL 返回预置响应体的 JSON 获取器
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: &str, value: Value) -> Self {
        self.bodies.insert(url.to_string(), value.to_string());
        self
    }

    /// 预置原始响应体（可用于构造无效 JSON）
    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl JsonFetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> AppResult<Value> {
        self.calls.lock().unwrap().push(url.to_string());
        // 让出执行权，模拟真实请求的挂起点
        tokio::task::yield_now().await;
        if self.failing.contains(url) {
            return Err(AppError::HttpStatus {
                status: 500,
                url: url.to_string(),
            });
        }
        match self.bodies.get(url) {
            Some(body) => Ok(serde_json::from_str(body)?),
            None => Err(AppError::not_found(url)),
        }
    }
}

/// 以文件路径为键的内存仓库
#[derive(Default)]
pub struct FakeRepository {
    files: BTreeMap<String, Vec<u8>>,
    failing: HashSet<String>,
    list_calls: AtomicUsize,
    content_calls: AtomicUsize,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn with_json(self, path: &str, value: Value) -> Self {
        let body = value.to_string();
        self.with_file(path, body.as_bytes())
    }

    pub fn failing_directory(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.content_calls()
    }
}

#[async_trait]
impl RepositoryClient for FakeRepository {
    async fn list_directory(&self, path: &str, _git_ref: &str) -> AppResult<Vec<DirectoryEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let path = path.trim_matches('/');
        if self.failing.contains(path) {
            return Err(AppError::network(format!("listing {path} failed")));
        }

        let prefix = format!("{path}/");
        let mut entries = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        for (key, content) in self.files.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        entries.push(DirectoryEntry {
                            name: dir.to_string(),
                            path: format!("{prefix}{dir}"),
                            size: 0,
                            kind: EntryKind::Dir,
                            download_url: None,
                        });
                    }
                }
                None => entries.push(DirectoryEntry {
                    name: rest.to_string(),
                    path: key.clone(),
                    size: content.len() as u64,
                    kind: EntryKind::File,
                    download_url: Some(format!("https://raw.example.org/{key}")),
                }),
            }
        }

        if entries.is_empty() {
            return Err(AppError::not_found(path));
        }
        Ok(entries)
    }

    async fn fetch_file_content(&self, path: &str, _git_ref: &str) -> AppResult<FileContent> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let content = self
            .files
            .get(path.trim_matches('/'))
            .ok_or_else(|| AppError::not_found(path))?;
        Ok(FileContent {
            content: base64::engine::general_purpose::STANDARD.encode(content),
            encoding: Some("base64".to_string()),
        })
    }
}

//! 安装包目录编排
//!
//! 先尝试清单（`installers.json` 等），清单缺失或没有产出任何安装包时回退到
//! 托管 API 的目录遍历。对外只暴露一个不会失败的 `list_installer_assets`：
//! 内部的所有错误都记录日志后转换为空结果。

use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::asset::{AssetBuilder, AssetContext, AssetInput, InstallerAsset};
use super::classifier::{
    file_name, is_absolute_url, is_binary_file, is_metadata_file, metadata_key_for_binary,
    metadata_path_for_binary,
};
use super::grouping::{group_installers, sort_by_platform, InstallerTree};
use super::manifest::{ManifestFileEntry, ManifestWalker, PathRules};
use super::metadata::{merge_metadata, Metadata};
use super::platform::Platform;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::CatalogConfig;
use crate::infrastructure::remote::{
    DirectoryEntry, GitHubContentsClient, HttpClient, JsonFetcher, RemoteDirectoryWalker,
    RepositoryClient,
};

/// 安装包目录服务
pub struct InstallerCatalog {
    config: Arc<CatalogConfig>,
    fetcher: Arc<dyn JsonFetcher>,
    repository: Option<Arc<dyn RepositoryClient>>,
    rules: PathRules,
}

impl InstallerCatalog {
    pub fn new(
        config: Arc<CatalogConfig>,
        fetcher: Arc<dyn JsonFetcher>,
        repository: Option<Arc<dyn RepositoryClient>>,
    ) -> Self {
        let rules = PathRules::new(&config.installers_path, config.installers_base_url());
        Self {
            config,
            fetcher,
            repository,
            rules,
        }
    }

    /// 使用真实的 HTTP 与 GitHub 客户端
    pub fn from_config(config: Arc<CatalogConfig>) -> AppResult<Self> {
        let http = HttpClient::with_timeout(config.request_timeout_secs)?;
        let repository = config.repository().map(|(owner, repo)| {
            Arc::new(GitHubContentsClient::new(
                http.clone(),
                config.api_base_url.as_str(),
                owner,
                repo,
            )) as Arc<dyn RepositoryClient>
        });
        Ok(Self::new(config, Arc::new(http), repository))
    }

    /// 列出全部安装包，按平台、文件名排序
    pub async fn list_installer_assets(&self) -> Vec<InstallerAsset> {
        if let Some(manifest) = self.try_manifest().await {
            let assets = self.assets_from_manifest(&manifest).await;
            if !assets.is_empty() {
                info!(count = assets.len(), "从清单加载安装包");
                return assets;
            }
            info!("清单中没有可用的安装包，回退到远程目录");
        }
        self.assets_from_remote().await
    }

    /// 列出全部安装包并按目录分组
    pub async fn list_installer_tree(&self) -> InstallerTree {
        group_installers(&self.list_installer_assets().await)
    }

    fn installers_root(&self) -> String {
        self.config.installers_path.trim_matches('/').to_string()
    }

    /// 已配置仓库时返回仓库客户端
    fn repository_client(&self) -> Option<&dyn RepositoryClient> {
        self.config.repository()?;
        self.repository.as_deref()
    }

    fn asset_builder(&self) -> AssetBuilder<'_> {
        AssetBuilder::new(AssetContext {
            rules: &self.rules,
            api_base_url: &self.config.api_base_url,
            repository: self.config.repository(),
            git_ref: &self.config.installers_branch,
        })
    }

    /// 读取安装包根目录下的 JSON：优先公开地址，否则走仓库文件接口
    async fn fetch_installers_json(&self, location: &str) -> AppResult<Value> {
        if is_absolute_url(location) {
            return self.fetcher.fetch_json(location.trim()).await;
        }
        if let Some(base) = self.rules.base_url() {
            let url = base
                .join(location.trim_start_matches('/'))
                .map_err(|e| AppError::invalid_url(location, e))?;
            return self.fetcher.fetch_json(url.as_str()).await;
        }
        match self.repository_client() {
            Some(client) => {
                let path = format!("{}/{}", self.installers_root(), location.trim_start_matches('/'));
                self.fetch_repository_json(client, &path).await
            }
            None => Err(AppError::config("未配置安装包地址或仓库")),
        }
    }

    async fn fetch_repository_json(&self, client: &dyn RepositoryClient, path: &str) -> AppResult<Value> {
        client
            .fetch_file_content(path, &self.config.installers_branch)
            .await?
            .decode_json()
    }

    async fn try_manifest(&self) -> Option<Value> {
        for candidate in &self.config.manifest_candidates {
            match self.fetch_installers_json(candidate).await {
                Ok(manifest) => {
                    debug!(candidate = %candidate, "找到清单文件");
                    return Some(manifest);
                }
                Err(e) => debug!(candidate = %candidate, "清单候选不可用: {e}"),
            }
        }
        None
    }

    async fn assets_from_manifest(&self, manifest: &Value) -> Vec<InstallerAsset> {
        let entries = ManifestWalker::new(&self.rules).walk(manifest);
        debug!(count = entries.len(), "清单条目");

        let fetched = join_all(entries.iter().map(|entry| {
            let location = entry
                .metadata_path
                .clone()
                .unwrap_or_else(|| metadata_path_for_binary(&entry.path));
            async move { self.load_metadata(&location).await }
        }))
        .await;

        let builder = self.asset_builder();
        let mut assets: Vec<InstallerAsset> = entries
            .into_iter()
            .zip(fetched)
            .filter_map(|(entry, fetched)| builder.build(manifest_input(entry, fetched)))
            .collect();
        sort_by_platform(&mut assets);
        assets
    }

    /// 读取单个元数据文件；缺失或格式错误都视为没有元数据
    async fn load_metadata(&self, location: &str) -> Option<Metadata> {
        match self.fetch_installers_json(location).await {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                warn!(location, "元数据不是 JSON 对象，已忽略");
                None
            }
            Err(e) if e.is_not_found() => {
                debug!(location, "没有元数据文件");
                None
            }
            Err(e) => {
                warn!(location, "读取元数据失败: {e}");
                None
            }
        }
    }

    async fn assets_from_remote(&self) -> Vec<InstallerAsset> {
        let Some(client) = self.repository_client() else {
            debug!("未配置仓库 owner/repo，跳过远程目录");
            return Vec::new();
        };

        let root = self.installers_root();
        let files = RemoteDirectoryWalker::new(client, &self.config.installers_branch)
            .list_files(&root)
            .await;

        let manifest_paths: Vec<String> = self
            .config
            .manifest_candidates
            .iter()
            .map(|candidate| format!("{root}/{candidate}").to_lowercase())
            .collect();
        let (metadata_files, binaries): (Vec<DirectoryEntry>, Vec<DirectoryEntry>) = files
            .into_iter()
            .filter(|f| !manifest_paths.contains(&f.path.to_lowercase()))
            .filter(|f| is_metadata_file(&f.path) || is_binary_file(&f.path))
            .partition(|f| is_metadata_file(&f.path));

        let fetched = join_all(metadata_files.iter().map(|file| async move {
            match self.fetch_repository_json(client, &file.path).await {
                Ok(Value::Object(map)) => Some((file, map)),
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %file.path, "解析元数据失败: {e}");
                    None
                }
            }
        }))
        .await;
        let index = MetadataIndex::build(fetched.into_iter().flatten());

        let builder = self.asset_builder();
        let mut assets: Vec<InstallerAsset> = binaries
            .into_iter()
            .filter_map(|file| {
                let metadata = index.resolve(&file);
                builder.build(AssetInput {
                    repository_path: Some(file.path.clone()),
                    size: Some(file.size),
                    remote_download_url: file.download_url,
                    metadata,
                    path: file.path,
                    ..Default::default()
                })
            })
            .collect();
        sort_by_platform(&mut assets);
        info!(count = assets.len(), "从远程目录加载安装包");
        assets
    }
}

fn manifest_input(entry: ManifestFileEntry, fetched: Option<Metadata>) -> AssetInput {
    let overrides = entry.override_metadata();
    let metadata = merge_metadata([fetched.as_ref(), entry.metadata.as_ref(), overrides.as_ref()]);
    AssetInput {
        path: entry.path,
        repository_path: None,
        size: entry.size,
        remote_download_url: None,
        name_override: entry.name_override,
        platform_override: entry.platform,
        metadata,
    }
}

/// 远程模式的元数据索引：完整键、文件名键、平台级
#[derive(Default)]
struct MetadataIndex {
    by_key: HashMap<String, Metadata>,
    by_basename: HashMap<String, Metadata>,
    by_platform: HashMap<Platform, Metadata>,
}

impl MetadataIndex {
    fn build<'f>(documents: impl IntoIterator<Item = (&'f DirectoryEntry, Metadata)>) -> Self {
        let mut index = Self::default();
        for (file, metadata) in documents {
            let basename_key = metadata_key_for_binary(file_name(&file.path));
            // 只有 `windows.json` 这类整体即平台名的文件才是平台级元数据
            if let Some(platform) = Platform::from_exact_label(&basename_key).filter(Platform::is_known) {
                index.by_platform.insert(platform, metadata.clone());
            }
            index
                .by_basename
                .entry(basename_key)
                .or_insert_with(|| metadata.clone());
            index.by_key.insert(metadata_key_for_binary(&file.path), metadata);
        }
        index
    }

    /// 合并顺序：平台级 → 同名 → 同路径，后者覆盖前者
    fn resolve(&self, binary: &DirectoryEntry) -> Option<Metadata> {
        let exact = self.by_key.get(&metadata_key_for_binary(&binary.path));
        let basename = self.by_basename.get(&metadata_key_for_binary(file_name(&binary.path)));

        let declared = merge_metadata([basename, exact])
            .and_then(|m| m.get("platform").and_then(Value::as_str).map(|p| Platform::normalize(Some(p))));
        let platform = declared.unwrap_or_else(|| Platform::infer_from_name(&binary.name));

        merge_metadata([self.by_platform.get(&platform), basename, exact])
    }
}

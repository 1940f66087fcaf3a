use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use super::classifier::{file_name, infer_content_type, is_absolute_url, is_binary_file};
use super::manifest::PathRules;
use super::metadata::{first_string, first_u64, InstallerDetails, Metadata};
use super::platform::Platform;
use crate::core::constants::patterns::PREVIEW_SEGMENT_PATTERN;
use crate::infrastructure::remote::contents_api_url;

static PREVIEW_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(PREVIEW_SEGMENT_PATTERN).expect("preview segment pattern must compile")
});

/// 最终输出的安装包记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerAsset {
    pub name: String,
    pub filename: String,
    pub path: String,
    pub relative_path: String,
    pub directories: Vec<String>,
    pub download_url: String,
    pub size: u64,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl InstallerAsset {
    /// 展示用的元数据摘要
    pub fn details(&self) -> Option<InstallerDetails> {
        self.metadata.as_ref().map(InstallerDetails::from_metadata)
    }
}

/// 构建安装包所需的原始信息（来自清单条目或远程目录列表）
#[derive(Debug, Clone, Default)]
pub struct AssetInput {
    pub path: String,
    /// 仓库内的完整路径，用于拼接 API 下载地址；清单条目由安装包根目录推导
    pub repository_path: Option<String>,
    pub size: Option<u64>,
    pub remote_download_url: Option<String>,
    pub name_override: Option<String>,
    pub platform_override: Option<String>,
    /// 已按优先级合并好的元数据
    pub metadata: Option<Metadata>,
}

/// 构建时使用的环境信息
#[derive(Debug, Clone, Copy)]
pub struct AssetContext<'a> {
    pub rules: &'a PathRules,
    pub api_base_url: &'a str,
    pub repository: Option<(&'a str, &'a str)>,
    pub git_ref: &'a str,
}

/// 安装包构建器
pub struct AssetBuilder<'a> {
    context: AssetContext<'a>,
}

impl<'a> AssetBuilder<'a> {
    pub fn new(context: AssetContext<'a>) -> Self {
        Self { context }
    }

    /// 构建安装包；文件名不是可识别的安装包时返回 `None`
    pub fn build(&self, input: AssetInput) -> Option<InstallerAsset> {
        let filename = file_name(&input.path).to_string();
        if !is_binary_file(&filename) {
            return None;
        }

        let metadata = input.metadata.filter(|m| !m.is_empty());
        let (relative_path, directories) = self.split_path(&input.path);

        let platform = resolve_platform(metadata.as_ref(), input.platform_override.as_deref(), &filename);
        let name = metadata
            .as_ref()
            .and_then(|m| first_string(m, &["displayName", "name"]))
            .or(input.name_override.filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| filename.clone());
        let content_type = metadata
            .as_ref()
            .and_then(|m| first_string(m, &["contentType", "content_type"]))
            .or_else(|| infer_content_type(&filename).map(str::to_string));
        let size = input
            .size
            .filter(|s| *s > 0)
            .or_else(|| {
                metadata
                    .as_ref()
                    .and_then(|m| first_u64(m, &["size", "fileSize", "file_size", "bytes"]))
            })
            .unwrap_or(0);

        let download_url = self.resolve_download_url(
            metadata.as_ref(),
            &input.path,
            &relative_path,
            input.remote_download_url.as_deref(),
            input.repository_path.as_deref(),
        );

        Some(InstallerAsset {
            name,
            filename,
            path: input.path,
            relative_path,
            directories,
            download_url,
            size,
            platform,
            content_type,
            metadata,
        })
    }

    /// 计算相对安装包根目录的路径与目录段
    pub fn split_path(&self, path: &str) -> (String, Vec<String>) {
        let segments: Vec<String> = if is_absolute_url(path) {
            match Url::parse(path.trim()) {
                Ok(url) => url
                    .path_segments()
                    .map(|s| {
                        s.filter(|s| !s.is_empty())
                            .map(|segment| {
                                urlencoding::decode(segment)
                                    .map(|decoded| decoded.into_owned())
                                    .unwrap_or_else(|_| segment.to_string())
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                Err(_) => vec![file_name(path).to_string()],
            }
        } else {
            path.replace('\\', "/")
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string)
                .collect()
        };

        let remaining = self.strip_root(&segments, is_absolute_url(path));
        let relative_path = remaining.join("/");
        let directories = remaining[..remaining.len().saturating_sub(1)].to_vec();
        (relative_path, directories)
    }

    /// URL 在任意位置查找根目录段；相对路径只去掉前导的预览段与根目录段
    fn strip_root<'s>(&self, segments: &'s [String], is_url: bool) -> &'s [String] {
        let rules = self.context.rules;
        let root = rules.root_segments();
        if is_url {
            if !root.is_empty() && segments.len() > root.len() {
                let found = (0..=segments.len() - root.len())
                    .find(|&start| rules.starts_with_root(&segments[start..]));
                if let Some(start) = found {
                    return &segments[start + root.len()..];
                }
            }
            // 安装包根目录之外的 URL 不产生目录层级
            return &segments[segments.len().saturating_sub(1)..];
        }

        let mut remaining = segments;
        if remaining.len() > 1 && PREVIEW_SEGMENT.is_match(&remaining[0].to_lowercase()) {
            remaining = &remaining[1..];
        }
        while remaining.len() > root.len() && rules.starts_with_root(remaining) {
            remaining = &remaining[root.len()..];
        }
        remaining
    }

    fn resolve_download_url(
        &self,
        metadata: Option<&Metadata>,
        path: &str,
        relative_path: &str,
        remote_download_url: Option<&str>,
        repository_path: Option<&str>,
    ) -> String {
        let base_url = self.context.rules.base_url();

        if let Some(explicit) = metadata.and_then(|m| first_string(m, &["downloadUrl", "download_url"])) {
            if is_absolute_url(&explicit) {
                return explicit;
            }
            if let Some(resolved) = base_url.and_then(|base| base.join(explicit.trim_start_matches('/')).ok()) {
                return resolved.to_string();
            }
        }

        if is_absolute_url(path) {
            return path.trim().to_string();
        }

        if let Some(resolved) = base_url
            .filter(|_| !relative_path.is_empty())
            .and_then(|base| base.join(relative_path).ok())
        {
            return resolved.to_string();
        }

        if let Some(remote) = remote_download_url.filter(|u| !u.trim().is_empty()) {
            return remote.to_string();
        }

        if let Some((owner, repo)) = self.context.repository {
            let repository_path = match repository_path {
                Some(p) => p.to_string(),
                None => {
                    let mut parts = self.context.rules.root_segments().to_vec();
                    parts.push(relative_path.to_string());
                    parts.join("/")
                }
            };
            return contents_api_url(
                self.context.api_base_url,
                owner,
                repo,
                &repository_path,
                self.context.git_ref,
            );
        }

        path.to_string()
    }
}

/// 平台：合并元数据中的平台 → 条目覆盖值 → 文件名推断
fn resolve_platform(metadata: Option<&Metadata>, override_platform: Option<&str>, filename: &str) -> Platform {
    let declared = metadata
        .and_then(|m| first_string(m, &["platform"]))
        .or_else(|| override_platform.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string));
    match declared {
        Some(label) => Platform::normalize(Some(&label)),
        None => Platform::infer_from_name(filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rules() -> PathRules {
        PathRules::new(
            "installers",
            Some(Url::parse("https://owner.github.io/repo/installers/").unwrap()),
        )
    }

    fn context(rules: &PathRules) -> AssetContext<'_> {
        AssetContext {
            rules,
            api_base_url: "https://api.github.com",
            repository: Some(("owner", "repo")),
            git_ref: "gh-pages",
        }
    }

    fn meta(value: serde_json::Value) -> Option<Metadata> {
        value.as_object().cloned()
    }

    #[test]
    fn test_build_from_bare_path() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));
        let asset = builder
            .build(AssetInput {
                path: "app/setup.exe".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(asset.name, "setup.exe");
        assert_eq!(asset.platform, Platform::Windows);
        assert_eq!(asset.directories, vec!["app"]);
        assert_eq!(asset.relative_path, "app/setup.exe");
        assert_eq!(
            asset.download_url,
            "https://owner.github.io/repo/installers/app/setup.exe"
        );
        assert_eq!(asset.size, 0);
        assert_eq!(
            asset.content_type.as_deref(),
            Some("application/vnd.microsoft.portable-executable")
        );
        assert!(asset.metadata.is_none());
    }

    #[test]
    fn test_metadata_wins_for_name_and_platform() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));
        let asset = builder
            .build(AssetInput {
                path: "tool.zip".to_string(),
                name_override: Some("Override".to_string()),
                platform_override: Some("linux".to_string()),
                metadata: meta(json!({"name": "Tool", "platform": "mac", "fileSize": 99})),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(asset.name, "Tool");
        assert_eq!(asset.platform, Platform::MacOs);
        assert_eq!(asset.size, 99);

        let asset = builder
            .build(AssetInput {
                path: "tool.zip".to_string(),
                name_override: Some("Override".to_string()),
                platform_override: Some("SteamOS".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(asset.name, "Override");
        assert_eq!(asset.platform, Platform::Custom("SteamOS".to_string()));
    }

    #[test]
    fn test_rejects_non_binary() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));
        assert!(builder
            .build(AssetInput {
                path: "tool.json".to_string(),
                ..Default::default()
            })
            .is_none());
    }

    #[test]
    fn test_split_path_variants() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));

        assert_eq!(
            builder.split_path("installers/linux/x64/a.deb"),
            ("linux/x64/a.deb".to_string(), vec!["linux".to_string(), "x64".to_string()])
        );
        assert_eq!(
            builder.split_path("pr-42/installers/a.deb"),
            ("a.deb".to_string(), vec![])
        );
        assert_eq!(
            builder.split_path("pr-42/windows/a.exe"),
            ("windows/a.exe".to_string(), vec!["windows".to_string()])
        );
        assert_eq!(
            builder.split_path("https://owner.github.io/repo/installers/mac/a.dmg"),
            ("mac/a.dmg".to_string(), vec!["mac".to_string()])
        );
        assert_eq!(
            builder.split_path("https://cdn.example.org/releases/v1/a.dmg"),
            ("a.dmg".to_string(), vec![])
        );
        assert_eq!(
            builder.split_path("https://owner.github.io/repo/installers/My%20App/a.exe"),
            ("My App/a.exe".to_string(), vec!["My App".to_string()])
        );
    }

    #[test]
    fn test_nested_root_name_is_kept_for_relative_paths() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));
        let asset = builder
            .build(AssetInput {
                path: "tools/installers/helper.exe".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(asset.relative_path, "tools/installers/helper.exe");
        assert_eq!(asset.directories, vec!["tools", "installers"]);
        assert_eq!(
            asset.download_url,
            "https://owner.github.io/repo/installers/tools/installers/helper.exe"
        );
    }

    #[test]
    fn test_download_url_chain() {
        let rules = rules();
        let builder = AssetBuilder::new(context(&rules));

        let explicit = builder
            .build(AssetInput {
                path: "a.exe".to_string(),
                metadata: meta(json!({"downloadUrl": "https://cdn.example.org/a.exe"})),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(explicit.download_url, "https://cdn.example.org/a.exe");

        let no_base = PathRules::new("installers", None);
        let builder = AssetBuilder::new(context(&no_base));
        let remote = builder
            .build(AssetInput {
                path: "installers/a.exe".to_string(),
                remote_download_url: Some("https://raw.example.org/a.exe".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(remote.download_url, "https://raw.example.org/a.exe");

        let synthesized = builder
            .build(AssetInput {
                path: "win/a.exe".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            synthesized.download_url,
            "https://api.github.com/repos/owner/repo/contents/installers/win/a.exe?ref=gh-pages"
        );

        let bare = AssetBuilder::new(AssetContext {
            repository: None,
            ..context(&no_base)
        })
        .build(AssetInput {
            path: "win/a.exe".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(bare.download_url, "win/a.exe");
    }

    #[test]
    fn test_serialize_camel_case() {
        let rules = rules();
        let asset = AssetBuilder::new(context(&rules))
            .build(AssetInput {
                path: "linux/a.deb".to_string(),
                size: Some(5),
                ..Default::default()
            })
            .unwrap();
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value["relativePath"], json!("linux/a.deb"));
        assert_eq!(value["downloadUrl"], json!("https://owner.github.io/repo/installers/linux/a.deb"));
        assert_eq!(value["platform"], json!("Linux"));
        assert!(value.get("metadata").is_none());
    }
}

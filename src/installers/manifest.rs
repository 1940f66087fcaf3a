//! 清单树遍历
//!
//! 清单没有固定 schema：条目可能是数组、嵌套对象或以任意分类名作为键的子树。
//! 遍历时携带“目录上下文”（当前所在的逻辑目录段），把每个安装包还原成相对于
//! 安装包根目录的路径，并把同一路径的多次出现合并为一个条目。

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

use super::classifier::{file_name, is_absolute_url, is_binary_file, is_metadata_file};
use super::metadata::{fill_missing, first_string, first_u64, Metadata};
use crate::core::constants::manifest::{CHILD_KEYS, FIELD_KEYS, PATH_FIELDS, RESERVED_KEYS};

const DOWNLOAD_URL_KEYS: &[&str] = &["downloadUrl", "download_url", "url", "href"];
const SIZE_KEYS: &[&str] = &["size", "fileSize", "file_size", "bytes"];

/// 路径归一化规则：安装包根目录段与公开的安装包基础 URL
#[derive(Debug, Clone, Default)]
pub struct PathRules {
    root_segments: Vec<String>,
    base_url: Option<Url>,
}

impl PathRules {
    pub fn new(installers_path: &str, base_url: Option<Url>) -> Self {
        let root_segments = installers_path
            .replace('\\', "/")
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        Self {
            root_segments,
            base_url,
        }
    }

    pub fn root_segments(&self) -> &[String] {
        &self.root_segments
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub(crate) fn starts_with_root(&self, segments: &[String]) -> bool {
        !self.root_segments.is_empty()
            && segments.len() >= self.root_segments.len()
            && segments
                .iter()
                .zip(&self.root_segments)
                .all(|(seg, root)| seg.eq_ignore_ascii_case(root))
    }

    /// 归一化清单中的相对路径：统一分隔符，消解 `.` / `..`，去掉前导的根目录段。
    ///
    /// 位于基础 URL 之下的绝对 URL 会转换为相对路径，其他绝对 URL 原样返回。
    /// 该函数是幂等的。
    pub fn normalize(&self, path: &str) -> String {
        let trimmed = path.trim();
        if is_absolute_url(trimmed) {
            return match self
                .base_url
                .as_ref()
                .and_then(|base| trimmed.strip_prefix(base.as_str()))
            {
                Some(rest) => self.normalize_relative(&decode_path(rest)),
                None => trimmed.to_string(),
            };
        }
        self.normalize_relative(trimmed)
    }

    fn normalize_relative(&self, path: &str) -> String {
        let unified = path.replace('\\', "/");
        let mut segments: Vec<String> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        while self.starts_with_root(&segments) {
            segments.drain(..self.root_segments.len());
        }
        segments.join("/")
    }

    /// 以根目录段开头（可带 `./`）的路径
    fn has_leading_root(&self, path: &str) -> bool {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        self.starts_with_root(&segments)
    }

    /// 把清单中的原始路径与目录上下文结合。
    ///
    /// 裸文件名与 `./` 开头的路径挂到当前上下文下；以根目录段或 `/` 开头、
    /// 以及已经带目录的路径视为相对于安装包根目录；绝对 URL 不与上下文结合。
    pub fn combine(&self, context: &[String], raw: &str) -> String {
        let raw = raw.trim();
        if is_absolute_url(raw) {
            return self.normalize(raw);
        }
        let unified = raw.replace('\\', "/");
        let (explicit_context, rest) = match unified.strip_prefix("./") {
            Some(rest) => (true, rest),
            None => (false, unified.as_str()),
        };
        if unified.starts_with('/') || self.has_leading_root(rest) {
            return self.normalize(rest);
        }
        if !explicit_context && rest.contains('/') {
            return self.normalize(rest);
        }
        self.join_context(context, rest)
    }

    /// 目录标记的新上下文：在当前上下文下逐段深入；
    /// 以根目录段或 `/` 开头时从安装包根目录重新开始。
    pub fn descend(&self, context: &[String], raw: &str) -> Vec<String> {
        let raw = raw.trim();
        if is_absolute_url(raw) {
            return context.to_vec();
        }
        let unified = raw.replace('\\', "/");
        let rest = unified.strip_prefix("./").unwrap_or(&unified);
        let combined = if unified.starts_with('/') || self.has_leading_root(rest) {
            self.normalize(rest)
        } else {
            self.join_context(context, rest)
        };
        combined
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn join_context(&self, context: &[String], relative: &str) -> String {
        let mut joined = context.join("/");
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(relative);
        self.normalize_relative(&joined)
    }
}

/// 基础 URL 之下的路径部分按百分号编码解码
fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// `PathRules::normalize` 的函数形式
pub fn normalize_manifest_relative_path(path: &str, rules: &PathRules) -> String {
    rules.normalize(path)
}

/// 遍历清单过程中累积的单个安装包信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestFileEntry {
    /// 归一化后的相对路径（或清单基础 URL 之外的绝对 URL），同时作为去重键
    pub path: String,
    pub metadata_path: Option<String>,
    pub metadata: Option<Metadata>,
    pub name_override: Option<String>,
    pub platform: Option<String>,
    pub description: Option<String>,
    pub download_url: Option<String>,
    pub content_type: Option<String>,
    pub checksum: Option<String>,
    pub size: Option<u64>,
}

impl ManifestFileEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// 合并同一路径的另一次出现：只补充未设置的字段，内嵌元数据对象逐字段合并。
    pub fn merge_from(&mut self, other: ManifestFileEntry) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.metadata_path, other.metadata_path);
        fill(&mut self.name_override, other.name_override);
        fill(&mut self.platform, other.platform);
        fill(&mut self.description, other.description);
        fill(&mut self.download_url, other.download_url);
        fill(&mut self.content_type, other.content_type);
        fill(&mut self.checksum, other.checksum);
        fill(&mut self.size, other.size);

        if let Some(incoming) = other.metadata {
            let existing = self.metadata.get_or_insert_with(Metadata::new);
            fill_missing(existing, &incoming);
        }
    }

    /// 条目级覆盖字段组成的元数据，合并时优先级最高
    pub fn override_metadata(&self) -> Option<Metadata> {
        let mut overrides = Metadata::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };
        put("platform", self.platform.clone().map(Value::from));
        put("description", self.description.clone().map(Value::from));
        put("downloadUrl", self.download_url.clone().map(Value::from));
        put("contentType", self.content_type.clone().map(Value::from));
        put("checksum", self.checksum.clone().map(Value::from));
        put("size", self.size.map(Value::from));
        (!overrides.is_empty()).then_some(overrides)
    }
}

/// 单个清单对象节点的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 描述一个安装包文件，携带原始路径
    FileEntry { raw_path: String },
    /// 引入新的目录层级
    DirectoryMarker { segment: String },
    /// 普通容器，目录上下文不变
    OpaqueContainer,
}

fn string_field<'v>(object: &'v Map<String, Value>, key: &str) -> Option<&'v str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// 对清单对象节点做一次性分类
pub fn classify_node(object: &Map<String, Value>) -> NodeKind {
    let binary_path = PATH_FIELDS
        .iter()
        .filter_map(|key| string_field(object, key))
        .find(|value| is_binary_file(value));

    if let Some(raw) = binary_path {
        // 只有文件名时，尝试用以该文件名结尾的绝对下载地址恢复目录信息
        if !raw.contains('/') && !raw.contains('\\') {
            let url = DOWNLOAD_URL_KEYS
                .iter()
                .filter_map(|key| string_field(object, key))
                .find(|url| is_absolute_url(url) && file_name(url).eq_ignore_ascii_case(raw));
            if let Some(url) = url {
                return NodeKind::FileEntry {
                    raw_path: url.to_string(),
                };
            }
        }
        return NodeKind::FileEntry {
            raw_path: raw.to_string(),
        };
    }

    let declared_directory = string_field(object, "type")
        .map(|t| matches!(t.to_lowercase().as_str(), "directory" | "dir" | "folder"))
        .unwrap_or(false);

    let named = string_field(object, "path").or_else(|| string_field(object, "name"));
    match named {
        Some(segment) if declared_directory => NodeKind::DirectoryMarker {
            segment: segment.to_string(),
        },
        Some(segment) if !is_binary_file(segment) && !is_metadata_file(segment) => {
            NodeKind::DirectoryMarker {
                segment: segment.to_string(),
            }
        }
        _ => NodeKind::OpaqueContainer,
    }
}

fn is_non_directory_key(key: &str) -> bool {
    key.chars().all(|c| c.is_ascii_digit()) || key.contains('.') || FIELD_KEYS.contains(&key)
}

/// 清单树遍历器
pub struct ManifestWalker<'a> {
    rules: &'a PathRules,
}

impl<'a> ManifestWalker<'a> {
    pub fn new(rules: &'a PathRules) -> Self {
        Self { rules }
    }

    /// 遍历整个清单，返回按路径排序、去重后的条目
    pub fn walk(&self, manifest: &Value) -> Vec<ManifestFileEntry> {
        let mut entries = BTreeMap::new();
        self.visit(manifest, &[], &mut entries);
        entries.into_values().collect()
    }

    fn visit(
        &self,
        node: &Value,
        context: &[String],
        entries: &mut BTreeMap<String, ManifestFileEntry>,
    ) {
        match node {
            Value::String(raw) => {
                if is_binary_file(raw) {
                    let path = self.rules.combine(context, raw);
                    Self::register(entries, ManifestFileEntry::new(path));
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, context, entries);
                }
            }
            Value::Object(object) => self.visit_object(object, context, entries),
            _ => {}
        }
    }

    fn visit_object(
        &self,
        object: &Map<String, Value>,
        context: &[String],
        entries: &mut BTreeMap<String, ManifestFileEntry>,
    ) {
        let next_context = match classify_node(object) {
            NodeKind::FileEntry { raw_path } => {
                let entry = self.file_entry(object, context, &raw_path);
                Self::register(entries, entry);
                return;
            }
            NodeKind::DirectoryMarker { segment } => self.rules.descend(context, &segment),
            NodeKind::OpaqueContainer => context.to_vec(),
        };

        for key in CHILD_KEYS {
            if let Some(child) = object.get(*key) {
                self.visit(child, &next_context, entries);
            }
        }

        for (key, child) in object {
            if CHILD_KEYS.contains(&key.as_str()) || RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if !matches!(child, Value::String(_) | Value::Array(_) | Value::Object(_)) {
                continue;
            }
            if is_non_directory_key(key) {
                self.visit(child, &next_context, entries);
            } else {
                let mut nested = next_context.clone();
                nested.push(key.clone());
                self.visit(child, &nested, entries);
            }
        }
    }

    fn file_entry(
        &self,
        object: &Map<String, Value>,
        context: &[String],
        raw_path: &str,
    ) -> ManifestFileEntry {
        let metadata_path = ["metadataPath", "metadataFile"]
            .iter()
            .filter_map(|key| string_field(object, key))
            .next()
            .map(|raw| self.rules.combine(context, raw));

        ManifestFileEntry {
            path: self.rules.combine(context, raw_path),
            metadata_path,
            metadata: object.get("metadata").and_then(Value::as_object).cloned(),
            name_override: first_string(object, &["displayName", "title", "name"]),
            platform: first_string(object, &["platform", "os", "system"]),
            description: first_string(object, &["description", "details", "summary"]),
            download_url: first_string(object, DOWNLOAD_URL_KEYS),
            content_type: first_string(object, &["contentType", "mimeType"]),
            checksum: first_string(object, &["checksum", "sha256", "sha1", "md5"]),
            size: first_u64(object, SIZE_KEYS),
        }
    }

    fn register(entries: &mut BTreeMap<String, ManifestFileEntry>, entry: ManifestFileEntry) {
        if entry.path.is_empty() {
            return;
        }
        match entries.get_mut(&entry.path) {
            Some(existing) => existing.merge_from(entry),
            None => {
                entries.insert(entry.path.clone(), entry);
            }
        }
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

    fn paths(entries: &[ManifestFileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let rules = rules();
        let samples = [
            "installers/windows/setup.exe",
            "./installers/installers/a.zip",
            "\\windows\\..\\linux\\.\\a.deb",
            "https://owner.github.io/repo/installers/linux/a.tar.gz",
            "https://cdn.example.org/a.exe",
            "",
            "///",
            "../../a.exe",
            "Installers/MacOS/a.dmg",
        ];
        for sample in samples {
            let once = rules.normalize(sample);
            assert_eq!(rules.normalize(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn test_normalize_strips_root_and_base_url() {
        let rules = rules();
        assert_eq!(rules.normalize("installers/windows/setup.exe"), "windows/setup.exe");
        assert_eq!(rules.normalize("Installers/linux/a.deb"), "linux/a.deb");
        assert_eq!(
            rules.normalize("https://owner.github.io/repo/installers/linux/a.tar.gz"),
            "linux/a.tar.gz"
        );
        assert_eq!(
            rules.normalize("https://cdn.example.org/a.exe"),
            "https://cdn.example.org/a.exe"
        );
    }

    #[test]
    fn test_combine_context() {
        let rules = rules();
        let context = vec!["windows".to_string()];
        assert_eq!(rules.combine(&context, "setup.exe"), "windows/setup.exe");
        assert_eq!(rules.combine(&context, "./x64/setup.exe"), "windows/x64/setup.exe");
        assert_eq!(rules.combine(&context, "app/setup.exe"), "app/setup.exe");
        assert_eq!(rules.combine(&context, "/installers/app/setup.exe"), "app/setup.exe");
        let rooted = vec!["installers".to_string(), "linux".to_string()];
        assert_eq!(rules.combine(&rooted, "a.deb"), "linux/a.deb");
    }

    #[test]
    fn test_category_keys_are_directory_context_only() {
        let manifest = json!({
            "windows": ["app/setup.exe"],
            "linux": ["app/setup.tar.gz"]
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);

        assert_eq!(paths(&entries), vec!["app/setup.exe", "app/setup.tar.gz"]);
        assert!(entries.iter().all(|e| e.platform.is_none()));
    }

    #[test]
    fn test_bare_names_inherit_category_key() {
        let manifest = json!({"windows": ["setup.exe"], "android": {"arm64": "app.apk"}});
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["android/arm64/app.apk", "windows/setup.exe"]);
    }

    #[test]
    fn test_repeated_root_under_category_key_merges() {
        let manifest = json!({"windows": ["./installers/app/setup.exe", "app/setup.exe"]});
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["app/setup.exe"]);

        let manifest = json!({"tools": ["installers/x.exe", {"path": "./installers/x.exe", "size": 7}]});
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["x.exe"]);
        assert_eq!(entries[0].size, Some(7));
    }

    #[test]
    fn test_encoded_base_url_merges_with_plain_path() {
        let manifest = json!([
            "https://owner.github.io/repo/installers/My%20App/setup.exe",
            "My App/setup.exe"
        ]);
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["My App/setup.exe"]);
    }

    #[test]
    fn test_multi_segment_directory_marker_goes_deeper() {
        let manifest = json!({
            "type": "directory",
            "name": "linux",
            "children": [
                {"type": "directory", "path": "x64/gnu", "files": ["a.deb"]},
                {"type": "directory", "path": "installers/arm64", "files": ["b.deb"]}
            ]
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["arm64/b.deb", "linux/x64/gnu/a.deb"]);
    }

    #[test]
    fn test_descend_context() {
        let rules = rules();
        let context = vec!["linux".to_string()];
        assert_eq!(rules.descend(&context, "x64/gnu"), vec!["linux", "x64", "gnu"]);
        assert_eq!(rules.descend(&context, "./x64"), vec!["linux", "x64"]);
        assert_eq!(rules.descend(&context, "/installers/mac"), vec!["mac"]);
        assert_eq!(rules.descend(&context, "https://cdn.example.org/x"), vec!["linux"]);
    }

    #[test]
    fn test_duplicate_mentions_merge() {
        let manifest = json!({
            "files": [
                "app/setup.exe",
                {
                    "path": "app/setup.exe",
                    "displayName": "Setup",
                    "checksum": "abc",
                    "metadata": {"license": "MIT"}
                },
                {"file": "installers/app/setup.exe", "checksum": "zzz", "metadata": {"license": "GPL", "homepage": "https://x"}}
            ]
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name_override.as_deref(), Some("Setup"));
        assert_eq!(entry.checksum.as_deref(), Some("abc"));
        let metadata = entry.metadata.as_ref().unwrap();
        assert_eq!(metadata.get("license"), Some(&json!("MIT")));
        assert_eq!(metadata.get("homepage"), Some(&json!("https://x")));
    }

    #[test]
    fn test_directory_objects_and_child_keys() {
        let manifest = json!({
            "directories": [
                {
                    "type": "directory",
                    "name": "linux",
                    "children": [
                        {"type": "directory", "name": "x64", "files": ["a.tar.gz"]},
                        {"name": "arm64", "items": [{"filename": "b.deb", "size": "42"}]}
                    ]
                }
            ]
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["linux/arm64/b.deb", "linux/x64/a.tar.gz"]);
        assert_eq!(entries[0].size, Some(42));
    }

    #[test]
    fn test_numeric_dotted_and_field_keys_do_not_nest() {
        let manifest = json!({
            "releases": {
                "1": {"v1.2": ["a.zip"]},
                "version": "1.2.0",
                "latest": ["b.zip"]
            }
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(paths(&entries), vec!["releases/a.zip", "releases/latest/b.zip"]);
    }

    #[test]
    fn test_generator_summary_format() {
        let manifest = json!({
            "generated_at": "2024-01-01T00:00:00Z",
            "installers": [{
                "name": "Scriptagher for Windows (64-bit Installer)",
                "platform": "Windows",
                "file_name": "scriptagher-setup.exe",
                "file_size": 1024,
                "sha256": "ff",
                "download_url": "https://owner.github.io/repo/installers/windows/scriptagher-setup.exe"
            }]
        });
        let rules = rules();
        let entries = ManifestWalker::new(&rules).walk(&manifest);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.path, "windows/scriptagher-setup.exe");
        assert_eq!(entry.size, Some(1024));
        assert_eq!(entry.checksum.as_deref(), Some("ff"));
        assert_eq!(entry.platform.as_deref(), Some("Windows"));
    }

    #[test]
    fn test_no_binaries_yields_empty() {
        let manifest = json!({"title": "Nothing here", "files": ["readme.md", "notes.json"]});
        let rules = rules();
        assert!(ManifestWalker::new(&rules).walk(&manifest).is_empty());
    }

    #[test]
    fn test_classify_node() {
        let file = json!({"path": "a/b.exe", "name": "B"});
        assert_eq!(
            classify_node(file.as_object().unwrap()),
            NodeKind::FileEntry { raw_path: "a/b.exe".to_string() }
        );
        let dir = json!({"type": "Directory", "path": "linux"});
        assert_eq!(
            classify_node(dir.as_object().unwrap()),
            NodeKind::DirectoryMarker { segment: "linux".to_string() }
        );
        let meta_only = json!({"path": "tool.json"});
        assert_eq!(classify_node(meta_only.as_object().unwrap()), NodeKind::OpaqueContainer);
        let plain = json!({"items": []});
        assert_eq!(classify_node(plain.as_object().unwrap()), NodeKind::OpaqueContainer);
    }

    #[test]
    fn test_override_metadata() {
        let mut entry = ManifestFileEntry::new("a.exe");
        assert!(entry.override_metadata().is_none());
        entry.platform = Some("windows".to_string());
        entry.size = Some(10);
        let overrides = entry.override_metadata().unwrap();
        assert_eq!(overrides.get("platform"), Some(&json!("windows")));
        assert_eq!(overrides.get("size"), Some(&json!(10)));
    }
}

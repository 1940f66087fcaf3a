//! 应用程序常量定义
//!
//! 本模块包含全局使用的常量，避免魔数并提供统一的配置值。

/// 文件分类相关常量
pub mod files {
    /// 可识别的安装包扩展名；多段扩展名必须排在单段扩展名之前
    pub const BINARY_EXTENSIONS: &[&str] = &[
        ".tar.gz", ".tar.xz", ".tar.bz2", ".exe", ".msi", ".zip", ".tgz", ".dmg", ".pkg",
        ".appimage", ".deb", ".rpm", ".apk", ".aab", ".ipa",
    ];
    /// 元数据文件扩展名
    pub const METADATA_EXTENSION: &str = ".json";
    /// 扩展名 -> MIME 类型
    pub const CONTENT_TYPES: &[(&str, &str)] = &[
        (".tar.gz", "application/gzip"),
        (".tar.xz", "application/x-xz"),
        (".tar.bz2", "application/x-bzip2"),
        (".tgz", "application/gzip"),
        (".exe", "application/vnd.microsoft.portable-executable"),
        (".msi", "application/x-msi"),
        (".zip", "application/zip"),
        (".dmg", "application/x-apple-diskimage"),
        (".pkg", "application/vnd.apple.installer+xml"),
        (".appimage", "application/vnd.appimage"),
        (".deb", "application/vnd.debian.binary-package"),
        (".rpm", "application/x-rpm"),
        (".apk", "application/vnd.android.package-archive"),
        (".aab", "application/octet-stream"),
        (".ipa", "application/octet-stream"),
        (".json", "application/json"),
    ];
}

/// 清单遍历相关常量
pub mod manifest {
    /// 按顺序尝试的清单文件名
    pub const MANIFEST_CANDIDATES: &[&str] = &["installers.json", "manifest.json", "index.json"];
    /// 判断对象是否为文件条目的路径字段（按优先级）
    pub const PATH_FIELDS: &[&str] = &[
        "path",
        "relativePath",
        "file",
        "filename",
        "file_name",
        "fileName",
        "download",
    ];
    /// 子集合字段
    pub const CHILD_KEYS: &[&str] = &[
        "children",
        "items",
        "entries",
        "installers",
        "files",
        "directories",
        "folders",
        "contents",
    ];
    /// 不再递归的保留字段
    pub const RESERVED_KEYS: &[&str] = &["type", "path", "name", "metadata"];
    /// 递归时不产生目录层级的已知字段
    pub const FIELD_KEYS: &[&str] = &[
        "metadataPath",
        "metadataFile",
        "displayName",
        "title",
        "platform",
        "os",
        "system",
        "description",
        "details",
        "summary",
        "downloadUrl",
        "download_url",
        "url",
        "href",
        "contentType",
        "mimeType",
        "checksum",
        "sha256",
        "sha1",
        "md5",
        "size",
        "fileSize",
        "file_size",
        "bytes",
        "version",
        "format",
        "generated_at",
        "generatedAt",
        "last_updated",
        "lastUpdated",
        "updated_at",
        "updatedAt",
        "license",
        "licence",
        "licenseUrl",
        "maintainer",
        "author",
        "owner",
        "vendor",
        "homepage",
        "projectUrl",
        "sourceUrl",
        "repository",
        "releaseNotesUrl",
        "architecture",
        "build_variant",
        "distribution",
        "$schema",
        "schema",
    ];
}

/// 网络相关常量
pub mod network {
    /// 默认请求超时时间（秒）
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// User-Agent
    pub const USER_AGENT: &str = concat!("scriptagher/", env!("CARGO_PKG_VERSION"));
    /// GitHub API 地址
    pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";
    /// GitHub API Accept 头
    pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
}

/// 版本信息常量
pub mod version {
    /// 应用程序名称
    pub const APP_NAME: &str = "scriptagher";
    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// 默认配置值
pub mod defaults {
    /// 默认安装包分支
    pub const INSTALLERS_BRANCH: &str = "gh-pages";
    /// 默认安装包目录
    pub const INSTALLERS_PATH: &str = "installers";
    /// 站点下 bot 目录
    pub const BOTS_DIR: &str = "bots";
    /// bot 总配置文件
    pub const BOTS_CONFIG_FILE: &str = "bots.json";
    /// bot 详情文件
    pub const BOT_DETAILS_FILE: &str = "Bot.json";
    /// 默认日志级别
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
    /// 默认配置目录
    pub const DEFAULT_CONFIG_DIR: &str = ".scriptagher";
    /// 生成器写出的汇总文件名
    pub const SUMMARY_FILE: &str = "metadata.json";
}

/// 正则表达式模式
pub mod patterns {
    /// PR 预览分支目录（如 pr-123）
    pub const PREVIEW_SEGMENT_PATTERN: &str = r"^pr-\d+$";
    /// pubspec.yaml 中的版本行
    pub const PUBSPEC_VERSION_PATTERN: &str = r"^version:\s*(.+)$";
}

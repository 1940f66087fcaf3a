//! 安装包元数据生成
//!
//! 遍历本地安装包目录，为每个安装包写出同名 `.json` 元数据，并生成汇总文件。
//! 生成的字段正是目录服务读取的元数据格式。

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::classifier::is_binary_file;
use crate::core::constants::defaults::SUMMARY_FILE;
use crate::core::constants::patterns::PUBSPEC_VERSION_PATTERN;
use crate::error::{AppError, AppResult};

const DEFAULT_REPOSITORY: &str = "scriptagher/scriptagher";

/// 生成参数
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub version: String,
    /// 不带结尾斜杠的下载根地址
    pub base_url: String,
    pub timestamp: String,
    pub summary_name: String,
}

impl GeneratorOptions {
    pub fn new(version: impl Into<String>, repository: Option<&str>) -> Self {
        Self {
            version: version.into(),
            base_url: base_url_for_repository(repository.unwrap_or(DEFAULT_REPOSITORY)),
            timestamp: current_timestamp(),
            summary_name: SUMMARY_FILE.to_string(),
        }
    }
}

/// 单个安装包的元数据文件内容
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedMetadata {
    pub name: String,
    pub platform: String,
    pub version: String,
    pub file_name: String,
    pub file_size: u64,
    pub sha256: String,
    pub download_url: String,
    pub format: String,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
}

#[derive(Serialize)]
struct Summary<'a> {
    generated_at: &'a str,
    installers: &'a [GeneratedMetadata],
}

/// `owner/repo` → GitHub Pages 上的安装包地址；只有 owner 时仓库名与之相同
pub fn base_url_for_repository(repository: &str) -> String {
    let (owner, repo) = repository
        .split_once('/')
        .unwrap_or((repository, repository));
    format!("https://{owner}.github.io/{repo}/installers")
}

/// UTC 时间戳，秒精度，`Z` 结尾
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// 从 pubspec.yaml 读取版本号
pub fn read_version(pubspec_path: &Path) -> AppResult<String> {
    let pattern = Regex::new(PUBSPEC_VERSION_PATTERN)
        .map_err(|e| AppError::config(format!("无效的版本匹配模式: {e}")))?;
    let reader = BufReader::new(File::open(pubspec_path)?);
    for line in reader.lines() {
        let line = line?;
        if let Some(captures) = pattern.captures(line.trim()) {
            return Ok(captures[1].trim().to_string());
        }
    }
    Err(AppError::config(format!(
        "无法从 {} 读取版本号",
        pubspec_path.display()
    )))
}

/// 计算文件的 SHA-256
pub fn sha256sum(path: &Path) -> AppResult<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// 扩展名（小写、不含点）与主干名
fn split_extension(file_name: &str) -> (String, &str) {
    if file_name.to_lowercase().ends_with(".tar.gz") {
        return ("tar.gz".to_string(), &file_name[..file_name.len() - ".tar.gz".len()]);
    }
    match file_name.rfind('.') {
        Some(dot) => (file_name[dot + 1..].to_lowercase(), &file_name[..dot]),
        None => (String::new(), file_name),
    }
}

fn platform_label(platform_dir: &str) -> String {
    match platform_dir {
        "android" => "Android".to_string(),
        "ios" => "iOS".to_string(),
        "linux" => "Linux".to_string(),
        "macos" => "macOS".to_string(),
        "windows" => "Windows".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        }
    }
}

fn android_arch_label(identifier: &str) -> String {
    match identifier {
        "arm64-v8a" => "ARM64-v8a",
        "armeabi-v7a" => "ARMv7",
        other => other,
    }
    .to_string()
}

fn linux_arch_label(identifier: &str) -> String {
    match identifier {
        "x64" => "x86_64",
        other => other,
    }
    .to_string()
}

/// 为单个安装包构建元数据；`segments` 是相对安装包目录的路径段
pub fn build_metadata(
    segments: &[String],
    full_path: &Path,
    options: &GeneratorOptions,
) -> AppResult<GeneratedMetadata> {
    let (platform_dir, file_name) = match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => (first.as_str(), last.as_str()),
        _ => return Err(AppError::config("空的安装包路径")),
    };
    let platform = platform_label(platform_dir);
    let (extension, stem) = split_extension(file_name);

    let mut metadata = GeneratedMetadata {
        name: format!("Scriptagher for {platform}"),
        platform: platform.clone(),
        version: options.version.clone(),
        file_name: file_name.to_string(),
        file_size: fs::metadata(full_path)?.len(),
        sha256: sha256sum(full_path)?,
        download_url: format!("{}/{}", options.base_url.trim_end_matches('/'), segments.join("/")),
        format: extension.to_uppercase(),
        last_updated: options.timestamp.clone(),
        architecture: None,
        build_variant: None,
        distribution: None,
    };

    match platform_dir {
        "android" => {
            let abi = stem.strip_prefix("scriptagher-").unwrap_or(stem);
            let abi = abi.strip_suffix("-debug").unwrap_or(abi);
            let architecture = android_arch_label(abi);
            metadata.name = format!("Scriptagher for {platform} ({architecture} · Debug Build)");
            metadata.architecture = Some(architecture);
            metadata.build_variant = Some("Debug".to_string());
        }
        "linux" => {
            let identifier = stem.rsplit('-').next().unwrap_or("x86_64");
            let architecture = linux_arch_label(identifier);
            metadata.name = format!("Scriptagher for {platform} ({architecture} · Release Build)");
            metadata.architecture = Some(architecture);
            metadata.build_variant = Some("Release".to_string());
        }
        "windows" => {
            metadata.architecture = Some("x86_64".to_string());
            metadata.build_variant = Some("Release".to_string());
            metadata.distribution = Some("Installer".to_string());
            metadata.name = "Scriptagher for Windows (64-bit Installer)".to_string();
        }
        "macos" => {
            metadata.build_variant = Some("Release".to_string());
            metadata.distribution = Some("Disk Image".to_string());
            metadata.name = "Scriptagher for macOS (Release Build)".to_string();
        }
        "ios" => {
            metadata.build_variant = Some("Release".to_string());
            metadata.distribution = Some("IPA Package".to_string());
            metadata.name = "Scriptagher for iOS (Release Build)".to_string();
        }
        _ => {}
    }

    Ok(metadata)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

fn sibling_metadata_path(binary: &Path, stem: &str) -> PathBuf {
    binary.with_file_name(format!("{stem}.json"))
}

/// 为目录下的全部安装包生成元数据，返回按下载地址排序的结果
pub fn generate_metadata(
    installers_dir: &Path,
    options: &GeneratorOptions,
) -> AppResult<Vec<GeneratedMetadata>> {
    if !installers_dir.is_dir() {
        return Err(AppError::not_found(installers_dir.display().to_string()));
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(installers_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| AppError::Io {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') || file_name.to_lowercase().ends_with(".json") {
            continue;
        }
        if !is_binary_file(&file_name) {
            debug!(file = %file_name, "跳过非安装包文件");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(installers_dir)
            .map_err(|e| AppError::Io {
                message: e.to_string(),
            })?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        let metadata = build_metadata(&segments, entry.path(), options)?;
        let (_, stem) = split_extension(&file_name);
        write_json(&sibling_metadata_path(entry.path(), stem), &metadata)?;
        artifacts.push(metadata);
    }

    artifacts.sort_by(|a, b| a.download_url.cmp(&b.download_url));
    write_json(
        &installers_dir.join(&options.summary_name),
        &Summary {
            generated_at: &options.timestamp,
            installers: &artifacts,
        },
    )?;
    info!(count = artifacts.len(), "已生成安装包元数据");
    Ok(artifacts)
}

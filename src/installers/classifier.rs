//! 路径与文件名分类
//!
//! 纯函数：判断元数据文件 / 安装包、计算元数据关联键、推断平台与 MIME 类型。
//! 所有函数都是全函数，不返回错误，只回退到默认值。

use super::platform::Platform;
use crate::core::constants::files::{BINARY_EXTENSIONS, CONTENT_TYPES, METADATA_EXTENSION};

/// 小写并统一分隔符；绝对 URL 去掉查询串和片段
fn normalize(path: &str) -> String {
    let normalized = path.trim().to_lowercase().replace('\\', "/");
    if is_absolute_url(&normalized) {
        let end = normalized.find(['?', '#']).unwrap_or(normalized.len());
        normalized[..end].to_string()
    } else {
        normalized
    }
}

/// 是否为带协议的绝对 URL
pub fn is_absolute_url(value: &str) -> bool {
    let value = value.trim();
    match value.find("://") {
        Some(idx) if idx > 0 => value[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// 路径最后一段（文件名）
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim();
    let without_query = if is_absolute_url(trimmed) {
        let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
        &trimmed[..end]
    } else {
        trimmed
    };
    without_query
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
}

/// 是否为元数据文件（`.json`）
pub fn is_metadata_file(path: &str) -> bool {
    normalize(path).ends_with(METADATA_EXTENSION)
}

/// 返回安装包扩展名（含点），多段扩展名优先
pub fn binary_extension(path: &str) -> Option<&'static str> {
    let normalized = normalize(path);
    BINARY_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| normalized.ends_with(ext) && normalized.len() > ext.len())
}

/// 是否为可识别的安装包
pub fn is_binary_file(path: &str) -> bool {
    binary_extension(path).is_some()
}

/// 元数据关联键：小写、去掉（可能多段的）扩展名。
///
/// 安装包与同名 `.json` 得到同一个键。
pub fn metadata_key_for_binary(path: &str) -> String {
    let normalized = normalize(path);
    if let Some(ext) = binary_extension(&normalized) {
        return normalized[..normalized.len() - ext.len()].to_string();
    }
    if let Some(stem) = normalized.strip_suffix(METADATA_EXTENSION) {
        return stem.to_string();
    }
    strip_last_extension(&normalized).to_string()
}

/// 推导同级元数据文件路径：扩展名替换为 `.json`，保留原有大小写
pub fn metadata_path_for_binary(path: &str) -> String {
    let mut trimmed = path.trim();
    if is_absolute_url(trimmed) {
        let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
        trimmed = &trimmed[..end];
    }
    match binary_extension(trimmed) {
        Some(ext) => format!("{}{}", &trimmed[..trimmed.len() - ext.len()], METADATA_EXTENSION),
        None => format!("{}{}", strip_last_extension(trimmed), METADATA_EXTENSION),
    }
}

fn strip_last_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// 根据文件名推断平台
pub fn infer_platform_from_name(name: &str) -> Platform {
    Platform::infer_from_name(name)
}

/// 自由文本平台标签归一化
pub fn normalize_platform(label: Option<&str>) -> Platform {
    Platform::normalize(label)
}

/// 根据扩展名推断 MIME 类型
pub fn infer_content_type(name: &str) -> Option<&'static str> {
    let normalized = normalize(name);
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| normalized.ends_with(ext))
        .map(|(_, mime)| *mime)
}

//! 元数据合并与字段提取
//!
//! 元数据来源（内嵌、同级文件、平台级）按固定优先级浅合并；
//! license / maintainer / homepage 等字段形态不固定，这里统一提取为规整的字符串。

use serde::Serialize;
use serde_json::{Map, Value};

/// 安装包元数据：任意 JSON 对象
pub type Metadata = Map<String, Value>;

/// 查找 URL 时识别的对象字段
const URL_KEYS: &[&str] = &["url", "html_url", "href", "link"];
const CONTACT_NAME_KEYS: &[&str] = &["name", "displayName", "title", "login", "username"];
const CONTACT_EMAIL_KEYS: &[&str] = &["email", "mail"];
const CONTACT_URL_KEYS: &[&str] = &["url", "html_url", "homepage", "website", "href", "link"];
const LICENSE_NAME_KEYS: &[&str] = &["name", "title", "spdx_id", "spdxId", "spdx", "key", "id"];

/// 从左到右浅合并，后面的来源逐字段覆盖前面的；`null` 字段视为未设置。
///
/// 合并结果为空时返回 `None`。
pub fn merge_metadata<'a, I>(sources: I) -> Option<Metadata>
where
    I: IntoIterator<Item = Option<&'a Metadata>>,
{
    let mut merged = Metadata::new();
    for source in sources.into_iter().flatten() {
        for (key, value) in source {
            if !value.is_null() {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    (!merged.is_empty()).then_some(merged)
}

/// 只补充尚未设置的字段（先写入者优先）
pub fn fill_missing(target: &mut Metadata, source: &Metadata) {
    for (key, value) in source {
        if value.is_null() {
            continue;
        }
        let missing = target.get(key).map_or(true, Value::is_null);
        if missing {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// 取第一个非空字符串字段
pub fn first_string(metadata: &Metadata, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// 取第一个可解析为非负整数的字段（兼容字符串形式的数字）
pub fn first_u64(metadata: &Metadata, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
}

fn looks_like_url(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

/// 递归查找第一个形似 URL 的字符串。
///
/// 支持字符串、数组，以及带 `url|html_url|href|link` 字段的对象。
pub fn extract_first_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if looks_like_url(s) => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(extract_first_url),
        Value::Object(map) => URL_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(extract_first_url),
        _ => None,
    }
}

/// 把 maintainer / author 一类字段规整为一个可读字符串：
/// 对象输出 `Name · email · url`，数组用逗号连接，均去重。
pub fn extract_contact(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Array(items) => {
            let mut contacts: Vec<String> = Vec::new();
            for contact in items.iter().filter_map(extract_contact) {
                if !contacts.contains(&contact) {
                    contacts.push(contact);
                }
            }
            (!contacts.is_empty()).then(|| contacts.join(", "))
        }
        Value::Object(map) => {
            let mut parts: Vec<String> = Vec::new();
            let name = first_string(map, CONTACT_NAME_KEYS);
            let email = first_string(map, CONTACT_EMAIL_KEYS);
            let url = CONTACT_URL_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(extract_first_url);
            for part in [name, email, url].into_iter().flatten() {
                if !parts.contains(&part) {
                    parts.push(part);
                }
            }
            (!parts.is_empty()).then(|| parts.join(" · "))
        }
        _ => None,
    }
}

/// 规整后的许可证信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// 提取许可证：支持字符串或对象（name / title / spdx id / key），
/// URL 尽量从同级的 `licenseUrl` 或嵌套的 `url` / `html_url` 中获取。
pub fn extract_license(metadata: &Metadata) -> Option<LicenseInfo> {
    let raw = metadata.get("license").or_else(|| metadata.get("licence"));
    let companion_url = metadata
        .get("licenseUrl")
        .or_else(|| metadata.get("licenceUrl"))
        .and_then(extract_first_url);

    let (text, nested_url) = match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let text = s.trim().to_string();
            let url = looks_like_url(&text).then(|| text.clone());
            (Some(text), url)
        }
        Some(Value::Object(map)) => {
            let nested_url = extract_first_url(&Value::Object(map.clone()));
            (first_string(map, LICENSE_NAME_KEYS), nested_url)
        }
        _ => (None, None),
    };

    let url = companion_url.or(nested_url);
    match (text, url) {
        (Some(text), url) => Some(LicenseInfo { text, url }),
        (None, Some(url)) => Some(LicenseInfo {
            text: url.clone(),
            url: Some(url),
        }),
        (None, None) => None,
    }
}

/// 维护者：maintainer → author → owner → vendor
pub fn extract_maintainer(metadata: &Metadata) -> Option<String> {
    ["maintainer", "author", "owner", "vendor"]
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(extract_contact)
}

/// 主页：homepage → projectUrl → repository → sourceUrl
pub fn extract_homepage(metadata: &Metadata) -> Option<String> {
    ["homepage", "projectUrl", "repository", "sourceUrl"]
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(extract_first_url)
}

/// 面向展示的元数据摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
}

impl InstallerDetails {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            description: first_string(metadata, &["description", "details", "summary"]),
            version: first_string(metadata, &["version"]),
            license: extract_license(metadata),
            maintainer: extract_maintainer(metadata),
            homepage: extract_homepage(metadata),
            checksum: first_string(metadata, &["checksum", "sha256", "sha1", "md5"]),
            release_notes_url: metadata.get("releaseNotesUrl").and_then(extract_first_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_precedence() {
        let embedded = obj(json!({"platform": "linux", "checksum": "abc"}));
        let overrides = obj(json!({"platform": "windows"}));

        let merged = merge_metadata([Some(&embedded), Some(&overrides)]).unwrap();
        assert_eq!(merged.get("platform"), Some(&json!("windows")));
        assert_eq!(merged.get("checksum"), Some(&json!("abc")));
    }

    #[test]
    fn test_merge_skips_null_and_empty() {
        let first = obj(json!({"name": "Tool"}));
        let second = obj(json!({"name": null}));
        let merged = merge_metadata([Some(&first), None, Some(&second)]).unwrap();
        assert_eq!(merged.get("name"), Some(&json!("Tool")));

        let empty = Metadata::new();
        assert!(merge_metadata([Some(&empty), None]).is_none());
    }

    #[test]
    fn test_fill_missing_keeps_existing() {
        let mut target = obj(json!({"platform": "windows"}));
        fill_missing(&mut target, &obj(json!({"platform": "linux", "size": 3})));
        assert_eq!(target, obj(json!({"platform": "windows", "size": 3})));
    }

    #[test]
    fn test_extract_contact_shapes() {
        assert_eq!(extract_contact(&json!("  Jane  ")), Some("Jane".to_string()));
        assert_eq!(
            extract_contact(&json!({
                "name": "Jane",
                "email": "jane@example.org",
                "url": "https://example.org/jane"
            })),
            Some("Jane · jane@example.org · https://example.org/jane".to_string())
        );
        assert_eq!(
            extract_contact(&json!(["Jane", {"name": "Bob"}, "Jane"])),
            Some("Jane, Bob".to_string())
        );
        assert_eq!(extract_contact(&json!([])), None);
        assert_eq!(extract_contact(&json!(42)), None);
    }

    #[test]
    fn test_extract_license() {
        let meta = obj(json!({"license": "MIT", "licenseUrl": "https://opensource.org/licenses/MIT"}));
        assert_eq!(
            extract_license(&meta),
            Some(LicenseInfo {
                text: "MIT".to_string(),
                url: Some("https://opensource.org/licenses/MIT".to_string()),
            })
        );

        let meta = obj(json!({"licence": {"spdx_id": "Apache-2.0", "html_url": "https://example.org/l"}}));
        assert_eq!(
            extract_license(&meta),
            Some(LicenseInfo {
                text: "Apache-2.0".to_string(),
                url: Some("https://example.org/l".to_string()),
            })
        );

        assert_eq!(extract_license(&obj(json!({"name": "x"}))), None);
    }

    #[test]
    fn test_extract_first_url_nested() {
        let value = json!([
            "not a url",
            {"title": "x", "link": {"href": ["https://deep.example.org"]}}
        ]);
        assert_eq!(
            extract_first_url(&value),
            Some("https://deep.example.org".to_string())
        );
        assert_eq!(extract_first_url(&json!({"homepage": "https://x"})), None);
    }

    #[test]
    fn test_details_from_metadata() {
        let meta = obj(json!({
            "description": "Installer",
            "sha256": "deadbeef",
            "author": {"name": "Team"},
            "repository": {"url": "https://github.com/o/r"}
        }));
        let details = InstallerDetails::from_metadata(&meta);
        assert_eq!(details.description.as_deref(), Some("Installer"));
        assert_eq!(details.checksum.as_deref(), Some("deadbeef"));
        assert_eq!(details.maintainer.as_deref(), Some("Team"));
        assert_eq!(details.homepage.as_deref(), Some("https://github.com/o/r"));
    }

    #[test]
    fn test_first_u64() {
        let meta = obj(json!({"size": "12", "bytes": 7}));
        assert_eq!(first_u64(&meta, &["fileSize", "size", "bytes"]), Some(12));
        assert_eq!(first_u64(&obj(json!({"size": "n/a"})), &["size"]), None);
    }
}

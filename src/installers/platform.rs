use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// 安装包的展示平台。
///
/// 固定集合之外，元数据显式声明的自定义平台名称原样保留（`Custom`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    Other,
    Custom(String),
}

/// 文件名推断规则，按顺序匹配，第一个命中的规则生效。
static NAME_RULES: LazyLock<Vec<(Regex, Platform)>> = LazyLock::new(|| {
    let rule = |pattern: &str, platform: Platform| {
        (
            Regex::new(pattern).expect("platform pattern must compile"),
            platform,
        )
    };
    vec![
        rule(r"windows|win32|win64|\.exe$|\.msi$", Platform::Windows),
        rule(r"mac|darwin|osx|\.dmg$|\.pkg$", Platform::MacOs),
        rule(
            r"linux|\.appimage$|\.deb$|\.rpm$|\.tar\.(gz|xz|bz2)$|\.tgz$",
            Platform::Linux,
        ),
        rule(r"android|\.apk$|\.aab$", Platform::Android),
        rule(r"ios|\.ipa$", Platform::Ios),
    ]
});

/// 自由文本平台标签的关键词规则，精确匹配失败后按顺序查找。
static LABEL_RULES: LazyLock<Vec<(Regex, Platform)>> = LazyLock::new(|| {
    let rule = |pattern: &str, platform: Platform| {
        (
            Regex::new(pattern).expect("platform label pattern must compile"),
            platform,
        )
    };
    vec![
        rule(r"\b(windows|win32|win64|win)\b", Platform::Windows),
        rule(r"\b(macos|macosx|mac|darwin|osx)\b", Platform::MacOs),
        rule(r"linux", Platform::Linux),
        rule(r"android", Platform::Android),
        rule(r"\b(ios|ipados|iphoneos|iphone|ipad)\b", Platform::Ios),
    ]
});

impl Platform {
    /// 展示用名称
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Other => "Other",
            Platform::Custom(label) => label,
        }
    }

    /// 从文件名（或路径）推断平台，未命中任何规则时返回 `Other`。
    pub fn infer_from_name(name: &str) -> Self {
        let name_lower = name.to_lowercase().replace('\\', "/");
        NAME_RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(&name_lower))
            .map(|(_, platform)| platform.clone())
            .unwrap_or(Platform::Other)
    }

    /// 将自由文本的平台标签归一化到标准集合。
    ///
    /// 无法识别的非空标签原样透传；空值返回 `Other`。
    pub fn normalize(label: Option<&str>) -> Self {
        let Some(raw) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return Platform::Other;
        };
        if let Some(platform) = Self::from_exact_label(raw) {
            return platform;
        }

        let lower = raw.to_lowercase();
        LABEL_RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(&lower))
            .map(|(_, platform)| platform.clone())
            .unwrap_or_else(|| Platform::Custom(raw.to_string()))
    }

    /// 只接受整体就是平台名的标签（忽略大小写、空格、`-`、`_`）
    pub fn from_exact_label(label: &str) -> Option<Self> {
        let compact: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        match compact.as_str() {
            "windows" | "win" | "win32" | "win64" | "microsoftwindows" => Some(Platform::Windows),
            "macos" | "mac" | "osx" | "macosx" | "darwin" => Some(Platform::MacOs),
            "linux" | "gnulinux" => Some(Platform::Linux),
            "android" => Some(Platform::Android),
            "ios" | "iphoneos" | "ipados" => Some(Platform::Ios),
            "other" => Some(Platform::Other),
            _ => None,
        }
    }

    /// 是否属于标准平台集合（不含 `Other` 与自定义平台）
    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Other | Platform::Custom(_))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Platform::normalize(Some(&label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_name() {
        assert_eq!(Platform::infer_from_name("app/setup.exe"), Platform::Windows);
        assert_eq!(Platform::infer_from_name("tool-win64.zip"), Platform::Windows);
        assert_eq!(Platform::infer_from_name("Tool-Darwin.zip"), Platform::MacOs);
        assert_eq!(Platform::infer_from_name("tool.dmg"), Platform::MacOs);
        assert_eq!(Platform::infer_from_name("app/setup.tar.gz"), Platform::Linux);
        assert_eq!(Platform::infer_from_name("tool.AppImage"), Platform::Linux);
        assert_eq!(Platform::infer_from_name("scriptagher-arm64.apk"), Platform::Android);
        assert_eq!(Platform::infer_from_name("tool.ipa"), Platform::Ios);
        assert_eq!(Platform::infer_from_name("tool.zip"), Platform::Other);
    }

    #[test]
    fn test_first_rule_wins() {
        // macOS 的 tar 包：mac 规则先于 linux 的 .tar.gz 规则
        assert_eq!(
            Platform::infer_from_name("scriptagher-macos.tar.gz"),
            Platform::MacOs
        );
    }

    #[test]
    fn test_normalize_labels() {
        assert_eq!(Platform::normalize(Some("WINDOWS")), Platform::Windows);
        assert_eq!(Platform::normalize(Some("mac")), Platform::MacOs);
        assert_eq!(Platform::normalize(Some("Mac OS X")), Platform::MacOs);
        assert_eq!(Platform::normalize(Some("linux")), Platform::Linux);
        assert_eq!(Platform::normalize(Some("Android")), Platform::Android);
        assert_eq!(Platform::normalize(Some("ios")), Platform::Ios);
        assert_eq!(Platform::normalize(Some("")), Platform::Other);
        assert_eq!(Platform::normalize(None), Platform::Other);
        assert_eq!(
            Platform::normalize(Some("SteamOS")),
            Platform::Custom("SteamOS".to_string())
        );
    }

    #[test]
    fn test_normalize_free_text_labels() {
        assert_eq!(Platform::normalize(Some("Windows 10")), Platform::Windows);
        assert_eq!(Platform::normalize(Some("win x64")), Platform::Windows);
        assert_eq!(Platform::normalize(Some("Linux x86_64")), Platform::Linux);
        assert_eq!(Platform::normalize(Some("Ubuntu Linux (deb)")), Platform::Linux);
        assert_eq!(Platform::normalize(Some("macOS 14 (Apple Silicon)")), Platform::MacOs);
        assert_eq!(Platform::normalize(Some("Darwin arm64")), Platform::MacOs);
        assert_eq!(Platform::normalize(Some("Android 12+")), Platform::Android);
        assert_eq!(Platform::normalize(Some("iOS 17")), Platform::Ios);
        assert_eq!(
            Platform::normalize(Some("FreeBSD 14")),
            Platform::Custom("FreeBSD 14".to_string())
        );
        assert_eq!(Platform::from_exact_label("Mac OS X"), Some(Platform::MacOs));
        assert_eq!(Platform::from_exact_label("tool-linux"), None);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(Platform::MacOs.to_string(), "macOS");
        let json = serde_json::to_string(&Platform::Ios).unwrap();
        assert_eq!(json, "\"iOS\"");
        let parsed: Platform = serde_json::from_str("\"darwin\"").unwrap();
        assert_eq!(parsed, Platform::MacOs);
    }
}

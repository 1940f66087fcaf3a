use serde::Serialize;
use std::collections::BTreeMap;

/// 默认界面语言
pub const DEFAULT_LANGUAGE: &str = "it";
/// 首选语言之后依次尝试的语言
pub const FALLBACK_LANGUAGES: &[&str] = &["it", "en"];

/// 语言代码归一化：小写，去掉地区后缀（`en-US` → `en`），空值取默认语言
pub fn normalize_language(language: Option<&str>) -> String {
    language
        .map(|l| l.trim().to_lowercase())
        .and_then(|l| l.split(['-', '_']).next().map(str::to_string))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// 语言回退链：`[首选, it, en]`，去重
pub fn fallback_chain(preferred: Option<&str>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    let candidates = std::iter::once(normalize_language(preferred))
        .chain(FALLBACK_LANGUAGES.iter().map(|l| l.to_string()));
    for language in candidates {
        if !chain.contains(&language) {
            chain.push(language);
        }
    }
    chain
}

/// 按回退链选择翻译；键需已小写
pub fn pick_translation<'a, T>(translations: &'a BTreeMap<String, T>, chain: &[String]) -> Option<&'a T> {
    chain.iter().find_map(|language| translations.get(language))
}

/// 界面文案
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiStrings {
    pub view_source_label: &'static str,
    pub download_label: &'static str,
    pub start_command_label: &'static str,
    pub no_description_fallback: &'static str,
    pub no_start_command_fallback: &'static str,
    pub bots_label: &'static str,
    pub generic_error_title: &'static str,
    pub generic_error_message: &'static str,
    pub missing_value_fallback: &'static str,
    pub no_installers_message: &'static str,
}

impl UiStrings {
    pub const ENGLISH: UiStrings = UiStrings {
        view_source_label: "View source",
        download_label: "Download",
        start_command_label: "Start command",
        no_description_fallback: "No description available",
        no_start_command_fallback: "No start commands provided",
        bots_label: "Bots",
        generic_error_title: "Oops, something went wrong.",
        generic_error_message: "No bots available.",
        missing_value_fallback: "—",
        no_installers_message: "No installers available.",
    };

    pub const ITALIAN: UiStrings = UiStrings {
        view_source_label: "Vedi sorgente",
        download_label: "Scarica",
        start_command_label: "Comando di avvio",
        no_description_fallback: "Descrizione non disponibile",
        no_start_command_fallback: "Nessun comando disponibile",
        bots_label: "Bot",
        generic_error_title: "Ops, qualcosa è andato storto.",
        generic_error_message: "Nessun bot disponibile.",
        missing_value_fallback: "—",
        no_installers_message: "Nessun installer disponibile.",
    };

    fn for_exact(language: &str) -> Option<&'static UiStrings> {
        match language {
            "en" => Some(&Self::ENGLISH),
            "it" => Some(&Self::ITALIAN),
            _ => None,
        }
    }

    /// 回退链上第一个有文案的语言；都没有时用英文
    pub fn for_language(preferred: Option<&str>) -> UiStrings {
        fallback_chain(preferred)
            .iter()
            .find_map(|language| Self::for_exact(language))
            .unwrap_or(&Self::ENGLISH)
            .clone()
    }
}

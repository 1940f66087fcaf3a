use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

use super::i18n::{fallback_chain, pick_translation, UiStrings};
use crate::core::constants::defaults::{BOTS_CONFIG_FILE, BOTS_DIR, BOT_DETAILS_FILE};
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::CatalogConfig;
use crate::infrastructure::remote::{HttpClient, JsonFetcher};

/// 分组标题的翻译
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionTranslation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// 单个语言分组的配置
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionConfig {
    /// 语言代码（小写）→ 翻译
    pub translations: BTreeMap<String, SectionTranslation>,
}

/// bots.json 中的 bot 摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotSummary {
    pub bot_name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
}

/// 归一化后的 bots.json
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BotsConfiguration {
    pub sections: BTreeMap<String, SectionConfig>,
    /// 编程语言 → bot 列表
    pub bots: BTreeMap<String, Vec<BotSummary>>,
}

impl BotsConfiguration {
    /// 解析 bots.json：`sections` 之外、值为对象数组的顶层键都视为语言分组，
    /// 也接受嵌套的 `bots` 对象
    pub fn from_value(value: &Value) -> Self {
        let mut config = Self::default();
        let Some(root) = value.as_object() else {
            return config;
        };

        if let Some(sections) = root.get("sections").and_then(Value::as_object) {
            for (language, section) in sections {
                let translations: BTreeMap<String, SectionTranslation> = section
                    .get("translations")
                    .and_then(Value::as_object)
                    .map(|translations| {
                        translations
                            .iter()
                            .filter_map(|(lang, t)| {
                                serde_json::from_value(t.clone())
                                    .ok()
                                    .map(|t| (lang.to_lowercase(), t))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                config
                    .sections
                    .insert(language.clone(), SectionConfig { translations });
            }
        }

        let nested = root.get("bots").and_then(Value::as_object);
        let buckets = root
            .iter()
            .filter(|(key, _)| key.as_str() != "sections" && key.as_str() != "bots")
            .chain(nested.into_iter().flatten());
        for (language, bots) in buckets {
            let Some(items) = bots.as_array() else {
                continue;
            };
            let summaries: Vec<BotSummary> = items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| match serde_json::from_value(item.clone()) {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        warn!(language = %language, "忽略无效的 bot 条目: {e}");
                        None
                    }
                })
                .collect();
            if !summaries.is_empty() {
                config
                    .bots
                    .entry(language.clone())
                    .or_default()
                    .extend(summaries);
            }
        }

        config
    }

    pub fn find_bot(&self, language: &str, bot_name: &str) -> Option<&BotSummary> {
        self.bots
            .get(language)
            .and_then(|bots| bots.iter().find(|bot| bot.bot_name == bot_name))
    }

    /// 分组标题与摘要；没有翻译时用 `<Language> <Bots>`
    pub fn section_heading(&self, language: &str, chain: &[String], ui: &UiStrings) -> (String, Option<String>) {
        let translation = self
            .sections
            .get(language)
            .and_then(|section| pick_translation(&section.translations, chain));
        let title = translation
            .and_then(|t| t.title.clone())
            .unwrap_or_else(|| default_section_title(language, ui));
        (title, translation.and_then(|t| t.summary.clone()))
    }
}

fn default_section_title(language: &str, ui: &UiStrings) -> String {
    let mut chars = language.chars();
    match chars.next() {
        Some(first) => format!("{}{} {}", first.to_uppercase(), chars.as_str(), ui.bots_label),
        None => ui.bots_label.to_string(),
    }
}

/// 本地化后的 bot 详情
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedBotDetails {
    pub language: String,
    pub bot_name: String,
    pub display_name: String,
    pub short_description: String,
    pub description: String,
    pub start_command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, String>,
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 按语言回退链本地化 Bot.json
pub fn localize_bot_details(
    language: &str,
    bot_name: &str,
    raw: &Value,
    chain: &[String],
    ui: &UiStrings,
) -> LocalizedBotDetails {
    let empty = Map::new();
    let raw = raw.as_object().unwrap_or(&empty);

    let translations: BTreeMap<String, &Map<String, Value>> = raw
        .get("translations")
        .and_then(Value::as_object)
        .map(|t| {
            t.iter()
                .filter_map(|(lang, value)| value.as_object().map(|v| (lang.to_lowercase(), v)))
                .collect()
        })
        .unwrap_or_default();
    let translation = pick_translation(&translations, chain).copied();
    let translated = |key: &str| translation.and_then(|t| non_empty(t.get(key)));

    let display_name = translated("displayName")
        .or_else(|| non_empty(raw.get("displayName")))
        .or_else(|| non_empty(raw.get("botName")))
        .unwrap_or_else(|| bot_name.to_string());
    let short_description = translated("shortDescription")
        .or_else(|| non_empty(raw.get("shortDescription")))
        .or_else(|| non_empty(raw.get("description")))
        .unwrap_or_else(|| ui.no_description_fallback.to_string());
    let description = translated("description")
        .or_else(|| non_empty(raw.get("description")))
        .unwrap_or_else(|| ui.no_description_fallback.to_string());

    let actions = raw
        .get("actions")
        .and_then(Value::as_object)
        .map(|actions| {
            actions
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    LocalizedBotDetails {
        language: language.to_string(),
        bot_name: non_empty(raw.get("botName")).unwrap_or_else(|| bot_name.to_string()),
        display_name,
        short_description,
        description,
        start_command: raw
            .get("startCommand")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        path: non_empty(raw.get("path")),
        source_url: non_empty(raw.get("sourceUrl")),
        actions,
    }
}

/// 详情加载失败时由摘要构造的占位详情
pub fn fallback_bot_details(language: &str, summary: &BotSummary, ui: &UiStrings) -> LocalizedBotDetails {
    let description = summary
        .description
        .clone()
        .unwrap_or_else(|| ui.no_description_fallback.to_string());
    LocalizedBotDetails {
        language: language.to_string(),
        bot_name: summary.bot_name.clone(),
        display_name: summary.bot_name.clone(),
        short_description: summary.short_description.clone().unwrap_or_else(|| description.clone()),
        description,
        start_command: summary.start_command.clone().unwrap_or_default(),
        path: summary.path.clone(),
        source_url: None,
        actions: BTreeMap::new(),
    }
}

/// 一个语言分组的展示数据
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotSection {
    pub language: String,
    pub language_label: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub bots: Vec<LocalizedBotDetails>,
}

type SharedDocument = Shared<BoxFuture<'static, AppResult<Value>>>;

/// bot 目录服务
///
/// 同一个 `(language, botName)` 的详情请求共享一个进行中的 future；
/// 成功结果在服务生命周期内缓存，失败结果被移除以便重试。
pub struct BotService {
    config: Arc<CatalogConfig>,
    fetcher: Arc<dyn JsonFetcher>,
    details: Mutex<HashMap<(String, String), SharedDocument>>,
}

impl BotService {
    pub fn new(config: Arc<CatalogConfig>, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            config,
            fetcher,
            details: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: Arc<CatalogConfig>) -> AppResult<Self> {
        let http = HttpClient::with_timeout(config.request_timeout_secs)?;
        Ok(Self::new(config, Arc::new(http)))
    }

    fn bots_base_url(&self) -> AppResult<Url> {
        let site = self
            .config
            .site_base_url()
            .ok_or_else(|| AppError::config("未配置站点地址（site_base_url 或 github owner/repo）"))?;
        site.join(&format!("{BOTS_DIR}/"))
            .map_err(|e| AppError::invalid_url(site.as_str(), e))
    }

    fn bot_url(&self, language: &str, bot_name: &str, file: &str) -> AppResult<Url> {
        let base = self.bots_base_url()?;
        let relative = format!(
            "{}/{}/{}",
            urlencoding::encode(language),
            urlencoding::encode(bot_name),
            file.split('/')
                .map(|s| urlencoding::encode(s).into_owned())
                .collect::<Vec<_>>()
                .join("/")
        );
        base.join(&relative)
            .map_err(|e| AppError::invalid_url(&relative, e))
    }

    /// 读取并归一化 bots.json
    pub async fn get_bots_config(&self) -> AppResult<BotsConfiguration> {
        let url = self.bots_base_url()?.join(BOTS_CONFIG_FILE)?;
        let value = self.fetcher.fetch_json(url.as_str()).await?;
        Ok(BotsConfiguration::from_value(&value))
    }

    /// 读取并本地化 Bot.json
    pub async fn get_bot_details(
        &self,
        language: &str,
        bot_name: &str,
        preferred_language: Option<&str>,
    ) -> AppResult<LocalizedBotDetails> {
        let raw = self.bot_document(language, bot_name).await?;
        let chain = fallback_chain(preferred_language);
        let ui = UiStrings::for_language(preferred_language);
        Ok(localize_bot_details(language, bot_name, &raw, &chain, &ui))
    }

    async fn bot_document(&self, language: &str, bot_name: &str) -> AppResult<Value> {
        let key = (language.to_string(), bot_name.to_string());
        let shared = {
            let mut cache = self.details.lock().unwrap_or_else(|e| e.into_inner());
            match cache.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let url = self.bot_url(language, bot_name, BOT_DETAILS_FILE)?;
                    let fetcher = Arc::clone(&self.fetcher);
                    let future = async move { fetcher.fetch_json(url.as_str()).await }
                        .boxed()
                        .shared();
                    cache.insert(key.clone(), future.clone());
                    future
                }
            }
        };

        let result = shared.clone().await;
        if let Err(e) = &result {
            debug!(language, bot_name, "bot 详情加载失败，移除缓存: {e}");
            let mut cache = self.details.lock().unwrap_or_else(|e| e.into_inner());
            if cache.get(&key).is_some_and(|current| current.ptr_eq(&shared)) {
                cache.remove(&key);
            }
        }
        result
    }

    /// 按语言分组加载全部 bot；单个 bot 详情失败时用摘要占位
    pub async fn list_sections(&self, preferred_language: Option<&str>) -> AppResult<Vec<BotSection>> {
        let config = self.get_bots_config().await?;
        let chain = fallback_chain(preferred_language);
        let ui = UiStrings::for_language(preferred_language);

        let mut sections = Vec::new();
        for (language, bots) in &config.bots {
            let details = join_all(bots.iter().map(|summary| {
                let ui = &ui;
                async move {
                    match self
                        .get_bot_details(language, &summary.bot_name, preferred_language)
                        .await
                    {
                        Ok(mut details) => {
                            if details.path.is_none() {
                                details.path = summary.path.clone();
                            }
                            details
                        }
                        Err(e) => {
                            warn!(bot = %summary.bot_name, "加载 bot 详情失败: {e}");
                            fallback_bot_details(language, summary, ui)
                        }
                    }
                }
            }))
            .await;

            let (title, summary) = config.section_heading(language, &chain, &ui);
            sections.push(BotSection {
                language: language.clone(),
                language_label: language.to_uppercase(),
                title,
                summary,
                bots: details,
            });
        }
        Ok(sections)
    }

    /// bot 压缩包地址：`bots/<language>/<botName>/<path 或 botName.zip>`
    pub fn bot_download_url(&self, language: &str, summary: &BotSummary) -> AppResult<Url> {
        let asset = summary
            .path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| format!("{}.zip", summary.bot_name));
        self.bot_url(language, &summary.bot_name, &asset)
    }

    /// 下载 bot 压缩包
    pub async fn download_bot(&self, http: &HttpClient, language: &str, summary: &BotSummary) -> AppResult<Vec<u8>> {
        let url = self.bot_download_url(language, summary)?;
        http.download(url.as_str(), None).await
    }
}

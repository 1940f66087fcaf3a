pub mod i18n;
pub mod service;

pub use i18n::{fallback_chain, normalize_language, UiStrings};
pub use service::{
    localize_bot_details, BotSection, BotService, BotSummary, BotsConfiguration, LocalizedBotDetails,
};

//! Configuration types, loaded from the environment.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::flow::FlowVariant;

/// Telegram transport configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token. Never logged.
    pub bot_token: SecretString,
    /// Usernames or numeric user ids allowed to talk to the bot; `*` allows
    /// everyone.
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    /// Build from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_ALLOWED_USERS`. Returns
    /// `None` when no token is set (the channel is simply disabled).
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let allowed_users = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Some(Self {
            bot_token: SecretString::from(token),
            allowed_users,
        })
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Which flow variant to run.
    pub flow: FlowVariant,
    /// Telegram channel, if enabled.
    pub telegram: Option<TelegramConfig>,
}

impl BotConfig {
    /// Load from the environment. `INTAKE_FLOW` selects the variant
    /// (`minimal` or `extended`, default extended).
    pub fn from_env() -> Result<Self, ConfigError> {
        let flow = match std::env::var("INTAKE_FLOW") {
            Ok(raw) => FlowVariant::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "INTAKE_FLOW".to_string(),
                message: format!("expected 'minimal' or 'extended', got '{raw}'"),
            })?,
            Err(_) => FlowVariant::Extended,
        };
        Ok(Self {
            flow,
            telegram: TelegramConfig::from_env(),
        })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            flow: FlowVariant::Extended,
            telegram: None,
        }
    }
}

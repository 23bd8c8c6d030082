//! Error types for intake-bot.
//!
//! Nothing in the conversation core is fatal: malformed input is handled by
//! re-prompting and never surfaces here. These types cover the collaborators
//! around the core — configuration loading and transport channels. The
//! binary aggregates them through `anyhow` at the top level, so there is no
//! crate-wide error enum.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

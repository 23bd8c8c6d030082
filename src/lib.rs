//! intake-bot — conversational data-collection bot.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;

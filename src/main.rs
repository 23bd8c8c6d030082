use std::sync::Arc;

use intake_bot::channels::{Channel, CliChannel, Dispatcher, TelegramChannel};
use intake_bot::config::BotConfig;
use intake_bot::flow::{ConversationEngine, FlowConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🤖 intake-bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow: {:?}", config.flow);

    let engine = Arc::new(ConversationEngine::new(FlowConfig::for_variant(
        config.flow,
    )));

    let mut channels: Vec<Arc<dyn Channel>> = vec![Arc::new(CliChannel::new())];
    let mut active_channels = vec!["cli"];

    if let Some(telegram_config) = config.telegram.clone() {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if telegram_config.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                telegram_config.allowed_users.join(", ")
            }
        );
        channels.push(Arc::new(TelegramChannel::new(telegram_config)));
        active_channels.push("telegram");
    }

    eprintln!("   Channels: {}\n", active_channels.join(", "));

    let dispatcher = Arc::new(Dispatcher::new(engine));

    let mut handles = Vec::new();
    for channel in channels {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::spawn(async move { dispatcher.run(channel).await }));
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

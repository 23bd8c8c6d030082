//! Channel abstraction for event I/O.

pub mod channel;
pub mod cli;
pub mod dispatch;
pub mod telegram;

pub use channel::{Channel, EventStream, IncomingEvent};
pub use dispatch::Dispatcher;
pub use cli::CliChannel;
pub use telegram::TelegramChannel;

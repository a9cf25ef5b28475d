mod client;
mod napcat;

pub use client::BotClient;
pub use napcat::NapcatAdapter;

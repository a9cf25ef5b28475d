pub mod echo;
pub mod message;
pub mod network;
pub mod router;
pub mod websocket;

use anyhow::Result;
pub use router::context::Context;
pub use router::handler::Handler;
use std::sync::Arc;

use crate::{
    abi::{
        network::NapcatAdapter,
        router::handler::{NapcatRouter, Router},
    },
    config::Config,
    mute::MuteService,
};

/// 后台维持 WebSocket 连接，当前任务负责分发事件。
pub async fn run(config: Arc<Config>, service: Arc<MuteService>) -> Result<()> {
    let (adapter, subscribe) = NapcatAdapter::new();
    let client = websocket::BotWebsocketClient::new(config.napcat.clone(), adapter).await?;
    let mut router = NapcatRouter::new(subscribe, client.handler.clone(), service);

    tokio::spawn(client.run_forever());
    router.run().await;
    Ok(())
}

pub mod logic_import {
    pub use crate::abi::{Context, Handler, network::BotClient, websocket::BotHandler};
    pub use crate::logic::BuildHelp;
    pub use anyhow::Result;
    pub use helper::handler;
    pub use helper::register_handlers;
}

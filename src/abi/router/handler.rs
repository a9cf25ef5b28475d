use crate::{
    abi::{
        message::{Event, MessageType, event_meta::MetaEvent},
        network::BotClient,
        router::context::Context,
        websocket::BotHandler,
    },
    logic::dispatch_all_handlers,
    mute::MuteService,
};
use anyhow::Result;
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, trace};

#[async_trait]
pub trait Handler<T>: Send + Sync
where
    T: BotClient + BotHandler + fmt::Debug + 'static,
{
    async fn handle(&self, context: Context<T>) -> Result<()>;
}

#[async_trait]
pub trait Router<T>
where
    T: BotClient + BotHandler + fmt::Debug + 'static,
{
    fn new(
        subscribe: mpsc::UnboundedReceiver<Event>,
        client: Arc<T>,
        service: Arc<MuteService>,
    ) -> Self;
    fn get_client(&self) -> Arc<T>;
    async fn run(&mut self);
}

pub struct NapcatRouter<T: BotHandler> {
    subscribe: mpsc::UnboundedReceiver<Event>,
    client: Arc<T>,
    service: Arc<MuteService>,
}

#[async_trait]
impl<T: BotHandler + BotClient + fmt::Debug> Router<T> for NapcatRouter<T> {
    fn new(
        subscribe: mpsc::UnboundedReceiver<Event>,
        client: Arc<T>,
        service: Arc<MuteService>,
    ) -> Self {
        NapcatRouter {
            subscribe,
            client,
            service,
        }
    }

    fn get_client(&self) -> Arc<T> {
        self.client.clone()
    }

    async fn run(&mut self) {
        while let Some(event) = self.subscribe.recv().await {
            match event {
                Event::Message(msg) => {
                    debug!("处理消息事件: {:?}", msg);
                    if msg.get_sender().user_id == Some(msg.get_self_id()) {
                        trace!("忽略自己发出的消息");
                        continue;
                    }
                    let context = Context::new(self.get_client(), Arc::new(*msg), self.service.clone());
                    dispatch_all_handlers(context);
                }
                Event::MetaEvent(meta) => match meta {
                    MetaEvent::Heartbeat(hb) => {
                        trace!("收到心跳事件: {:?}", hb);
                    }
                    MetaEvent::Lifecycle(lc) => {
                        debug!("收到生命周期事件: {:?}", lc);
                    }
                    MetaEvent::Other => {}
                },
                Event::Other => {
                    trace!("忽略其他事件");
                }
            }
        }
    }
}

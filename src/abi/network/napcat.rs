use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tokio::sync::{OnceCell, mpsc};
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, error, info, trace, warn};

use crate::abi::{
    echo::EchoRegistry,
    message::{Event, Params, api},
    network::BotClient,
    websocket::BotHandler,
};

#[derive(Debug)]
pub struct NapcatAdapter {
    api_sender: OnceCell<mpsc::UnboundedSender<String>>,
    handler: mpsc::UnboundedSender<Event>,
    echoes: Arc<EchoRegistry>,
}

impl NapcatAdapter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        (
            NapcatAdapter {
                api_sender: OnceCell::new(),
                handler: tx,
                echoes: Arc::new(EchoRegistry::default()),
            },
            rx,
        )
    }
}

#[async_trait]
impl BotClient for NapcatAdapter {
    async fn call_api<T: Params + fmt::Debug>(
        &self,
        params: T,
    ) -> Result<api::ApiResponsePending<T::Response>> {
        let action = T::ACTION;
        let pending = self.echoes.register();

        let api_send = api::ApiSend {
            action,
            params,
            echo: pending.echo(),
        };
        let msg = serde_json::to_string(&api_send)?;
        debug!("调用 API: {}", action);
        trace!(?api_send);

        let sender = self
            .api_sender
            .get()
            .ok_or_else(|| anyhow!("API 发送通道未初始化"))?;
        sender
            .send(msg)
            .map_err(|e| anyhow!("发送 API 消息失败: {e}"))?;

        Ok(api::ApiResponsePending::new(pending))
    }
}

#[derive(Deserialize, Debug)]
struct EchoOnly {
    echo: serde_json::Value,
}

#[async_trait]
impl BotHandler for NapcatAdapter {
    async fn init(&self, api: mpsc::UnboundedSender<String>) -> Result<()> {
        self.api_sender.set(api)?;
        Ok(())
    }

    async fn handle_api(&self, message: Utf8Bytes) {
        debug!("收到API返回: {}", message);

        let echo = match serde_json::from_slice::<EchoOnly>(message.as_bytes()) {
            Ok(EchoOnly {
                echo: serde_json::Value::String(s),
            }) => s,
            Ok(EchoOnly { echo }) => echo.to_string(),
            Err(e) => {
                error!("解析 API 返回的 Echo 失败: {:?}", e);
                return;
            }
        };

        if !self.echoes.resolve(&echo, message.to_string()) {
            warn!("没有等待 Echo {} 的调用，响应已丢弃", echo);
        }
    }

    async fn handle_event(&self, event: Utf8Bytes) {
        trace!(?event);

        match serde_json::from_slice::<Event>(event.as_bytes()) {
            Ok(evt) => {
                if let Err(e) = self.handler.send(evt) {
                    error!("分发事件失败: {:?}", e);
                }
            }
            Err(e) => {
                error!("解析事件失败: {:?}", e);
            }
        }
    }

    async fn on_connect(&self) {
        info!("连接到服务器。");
    }

    async fn on_disconnect(&self) {
        info!("已断开与服务器的连接。");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::message::{api::SendGroupMessageParams, from_str};

    #[tokio::test]
    async fn call_api_round_trip() {
        let (adapter, _events) = NapcatAdapter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        adapter.init(tx).await.unwrap();

        let pending = adapter
            .call_api(SendGroupMessageParams::new(1, from_str("hi")))
            .await
            .unwrap();

        let sent: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(sent["action"], "send_group_msg");
        assert_eq!(sent["params"]["group_id"], 1);
        let echo = sent["echo"].as_str().unwrap().to_string();

        let reply = format!(
            r#"{{"status":"ok","retcode":0,"data":{{"message_id":5}},"echo":"{echo}"}}"#
        );
        adapter.handle_api(Utf8Bytes::from(reply)).await;

        let res = pending.wait_echo().await.unwrap();
        assert_eq!(res.status, api::Status::Ok);
        assert_eq!(res.data.unwrap().message_id, 5);
    }

    #[tokio::test]
    async fn call_before_init_fails() {
        let (adapter, _events) = NapcatAdapter::new();
        let result = adapter
            .call_api(SendGroupMessageParams::new(1, from_str("hi")))
            .await;
        assert!(result.is_err());
        assert_eq!(adapter.echoes.pending_count(), 0);
    }

    #[tokio::test]
    async fn events_are_forwarded() {
        let (adapter, mut events) = NapcatAdapter::new();
        adapter
            .handle_event(Utf8Bytes::from_static(
                r#"{"time":1,"self_id":1,"post_type":"notice","notice_type":"friend_add","user_id":2}"#,
            ))
            .await;
        assert!(matches!(events.recv().await, Some(Event::Other)));
    }
}

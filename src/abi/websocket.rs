use crate::config::ServerConfig;
use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::sink::SinkExt;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message, Utf8Bytes,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait BotHandler: Send + Sync + 'static {
    async fn init(&self, api: mpsc::UnboundedSender<String>) -> Result<()>;
    async fn handle_api(&self, message: Utf8Bytes);
    async fn handle_event(&self, event: Utf8Bytes);
    async fn on_connect(&self);
    async fn on_disconnect(&self);
}

/// `/event` 只读，`/api` 收发，两条连接任一断开就整体重连。
pub struct BotWebsocketClient<T: BotHandler> {
    config: ServerConfig,
    pub handler: Arc<T>,
    api_receiver: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl<T: BotHandler> BotWebsocketClient<T> {
    pub async fn new(config: ServerConfig, handler: T) -> Result<Self> {
        let (api_sender, api_receiver) = mpsc::unbounded_channel::<String>();
        let handler = Arc::new(handler);
        handler.init(api_sender).await?;
        Ok(BotWebsocketClient {
            config,
            handler,
            api_receiver: Arc::new(Mutex::new(api_receiver)),
        })
    }

    fn request(&self, path: &str) -> Result<Request> {
        let url = format!("ws://{}:{}/{}", self.config.host, self.config.port, path);
        let mut request = url.into_client_request()?;
        if let Some(token) = self.config.access_token.as_deref().filter(|t| !t.is_empty()) {
            request
                .headers_mut()
                .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        Ok(request)
    }

    /// 建立一次连接并阻塞到断开
    pub async fn connect(&self) -> Result<()> {
        info!(
            "正在连接到 WebSocket 服务器... {}:{}",
            self.config.host, self.config.port
        );
        debug!(?self.config);

        let (event_stream, _) = connect_async(self.request("event")?).await?;
        let (api_stream, _) = connect_async(self.request("api")?).await?;
        self.handler.on_connect().await;

        let (_, mut read_event) = event_stream.split();
        let (mut write_api, mut read_api) = api_stream.split();

        let handler = self.handler.clone();
        let event_read = async move {
            while let Some(message) = read_event.next().await {
                match message {
                    Ok(Message::Text(msg)) => {
                        let h = handler.clone();
                        tokio::spawn(async move {
                            h.handle_event(msg).await;
                        });
                    }
                    Ok(Message::Close(frame)) => {
                        warn!("Event 连接被关闭: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("读取 Event 失败: {:?}", e);
                        break;
                    }
                }
            }
        };

        let handler = self.handler.clone();
        let api_read = async move {
            while let Some(message) = read_api.next().await {
                match message {
                    Ok(Message::Text(msg)) => {
                        let h = handler.clone();
                        tokio::spawn(async move {
                            h.handle_api(msg).await;
                        });
                    }
                    Ok(Message::Close(frame)) => {
                        warn!("API 连接被关闭: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("读取 API 返回失败: {:?}", e);
                        break;
                    }
                }
            }
        };

        let receiver = self.api_receiver.clone();
        let api_write = async move {
            let mut receiver = receiver.lock().await;
            while let Some(msg) = receiver.recv().await {
                if let Err(e) = write_api.send(Message::Text(msg.into())).await {
                    error!("传输Message失败通过 WsWriter: {:?}", e);
                    break;
                }
            }
        };

        tokio::select! {
            _ = event_read => {}
            _ = api_read => {}
            _ = api_write => {}
        }

        self.handler.on_disconnect().await;
        Ok(())
    }

    /// 断线后按配置的间隔重连，永不返回
    pub async fn run_forever(self) {
        let interval = Duration::from_secs(self.config.reconnect_interval_secs.max(1));
        loop {
            if let Err(e) = self.connect().await {
                error!("WebSocket 连接失败: {:?}", e);
            }
            warn!("{} 秒后重连", interval.as_secs());
            tokio::time::sleep(interval).await;
        }
    }
}

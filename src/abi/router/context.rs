use crate::abi::message::{
    self, MessageSend, MessageType, Sender, Target, api, event_message::Message,
};
use crate::abi::network::BotClient;
use crate::abi::websocket::BotHandler;
use crate::mute::{ChatSink, MuteService, Trigger};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, trace};

#[derive(Debug)]
pub struct Context<T: BotClient + BotHandler + fmt::Debug + 'static> {
    pub client: Arc<T>,
    pub message: Arc<Message>,
    pub sender: Arc<Sender>,
    pub service: Arc<MuteService>,
    pub message_list: Vec<MessageSend>,
    pub message_text: Arc<str>,
    pub target: Target,
}

impl<T: BotClient + BotHandler + fmt::Debug + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Context {
            client: self.client.clone(),
            message: self.message.clone(),
            sender: self.sender.clone(),
            service: self.service.clone(),
            message_list: self.message_list.clone(),
            message_text: self.message_text.clone(),
            target: self.target,
        }
    }
}

async fn send_to<T: BotClient>(client: &T, target: Target, message: MessageSend) -> Result<()> {
    let res = match target {
        Target::Group(group_id) => {
            let params = api::SendGroupMessageParams::new(group_id, message);
            client.call_api(params).await?.wait_echo().await?
        }
        Target::Private(user_id) => {
            let params = api::SendPrivateMessageParams::new(user_id, message);
            client.call_api(params).await?.wait_echo().await?
        }
    };
    trace!(?res);
    match res.status {
        api::Status::Ok | api::Status::Async => Ok(()),
        api::Status::Failed => Err(anyhow!(
            "发送消息失败: {}",
            res.message.unwrap_or("未知错误".to_string())
        )),
    }
}

impl<T: BotClient + BotHandler + fmt::Debug + 'static> Context<T> {
    pub fn new(client: Arc<T>, message: Arc<Message>, service: Arc<MuteService>) -> Self {
        let target = message.get_target();
        let message_text = message.get_text();
        let sender = message.get_sender();
        Context {
            client,
            message,
            sender: Arc::new(sender),
            service,
            message_list: Vec::new(),
            message_text: Arc::from(message_text),
            target,
        }
    }

    pub async fn send_message(&self, message: MessageSend) -> Result<()> {
        send_to(&*self.client, self.target, message).await
    }

    /// 先攒着，Context 销毁时合并成一条发出
    pub fn send_message_async(&mut self, message: MessageSend) {
        self.message_list.push(message);
    }

    pub fn get_message_text(&self) -> &str {
        &self.message_text
    }

    pub fn get_target(&self) -> Target {
        self.target
    }

    /// `<前缀><cmd>` 后面紧跟空白或结束
    pub fn is_command(&self, cmd: &str) -> bool {
        let prefix = &self.service.config.bot.command_prefix;
        self.message_text
            .trim_start()
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix(cmd))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    }

    pub fn mentions_self(&self) -> bool {
        self.message.body().mentions(self.message.get_self_id())
    }

    pub fn trigger(&self) -> Trigger {
        Trigger {
            platform: self.service.config.bot.platform.clone(),
            group_id: self.target.group_id(),
            actor_id: self.sender.user_id,
            sender_name: self.sender.display_name(),
            text: self.message_text.to_string(),
            mentions_bot: self.mentions_self(),
        }
    }
}

#[async_trait]
impl<T: BotClient + BotHandler + fmt::Debug + 'static> ChatSink for Context<T> {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.send_message(message::from_str(text)).await
    }
}

impl<T: BotClient + BotHandler + fmt::Debug + 'static> Drop for Context<T> {
    fn drop(&mut self) {
        if self.message_list.is_empty() {
            return;
        }
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            error!("没有运行时，丢弃 {} 条待发送消息", self.message_list.len());
            return;
        };

        let client = self.client.clone();
        let target = self.target;
        let message = message::join_lines(std::mem::take(&mut self.message_list));
        rt.spawn(async move {
            if let Err(e) = send_to(&*client, target, message).await {
                error!("发送消息失败: {:?}", e);
            }
        });
    }
}

mod flag;
mod planner;
mod rewrite;

pub use flag::LlmBool;
pub use planner::{ActionPlanner, LlmPlanner, MuteDecision, PlanContext};
pub use rewrite::{LlmRewriter, ReplyRewriter, Verbatim};

use crate::config::LlmConfig;
use anyhow::{Result, anyhow};
use genai::{
    Client, ModelIden, ServiceTarget,
    chat::{ChatMessage, ChatRequest},
    resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver},
};
use quick_xml::de::from_str;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

pub trait LlmPrompt {
    fn get_prompt_schema() -> &'static str;
    fn root_name() -> &'static str;
}

pub struct LlmClient {
    client: Client,
    model: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        // 1. AuthResolver：优先读环境变量，兼容直接写在配置里的 sk- 明文
        let api_key_env = config.api_key_env.clone();
        let auth_resolver = AuthResolver::from_resolver_fn(move |_model_id: ModelIden| {
            if let Ok(key) = std::env::var(&api_key_env) {
                return Ok(Some(AuthData::from_single(key)));
            }
            if api_key_env.starts_with("sk-") {
                return Ok(Some(AuthData::from_single(api_key_env.clone())));
            }
            Ok(None)
        });

        let mut builder = Client::builder().with_auth_resolver(auth_resolver);

        // 2. ServiceTargetResolver：配置了 base_url 才改写，否则走 genai 默认地址
        if let Some(base_url) = config.base_url.clone() {
            // 进程内只构造一次
            let base_url: &'static str = Box::leak(base_url.into_boxed_str());
            let target_resolver =
                ServiceTargetResolver::from_resolver_fn(move |mut target: ServiceTarget| {
                    target.endpoint = Endpoint::from_static(base_url);
                    Ok(target)
                });
            builder = builder.with_service_target_resolver(target_resolver);
        }

        LlmClient {
            client: builder.build(),
            model: config.model.clone(),
        }
    }

    pub async fn ask(&self, chat_message: Vec<ChatMessage>) -> Result<String> {
        let chat_req = ChatRequest::new(chat_message);
        let res = self
            .client
            .exec_chat(self.model.as_str(), chat_req, None)
            .await?;
        let text = res
            .first_text()
            .ok_or_else(|| anyhow!("No response"))?
            .to_string();
        trace!("LLM 返回: {}", text);
        Ok(text)
    }

    pub async fn ask_as<T>(&self, mut chat_message: Vec<ChatMessage>) -> Result<T>
    where
        T: DeserializeOwned + LlmPrompt,
    {
        chat_message.push(ChatMessage::system(
            "你必须直接返回 XML 格式的数据，禁止任何开场白。格式规范如下：",
        ));
        chat_message.push(ChatMessage::system(T::get_prompt_schema()));

        let text = self.ask(chat_message).await?;
        debug!("解析 <{}> 回复", T::root_name());
        parse_xml(&text)
    }
}

/// 截取第一个 `<` 到最后一个 `>` 之间的内容再反序列化，模型爱在 XML 外面说废话。
pub fn parse_xml<T: DeserializeOwned>(text: &str) -> Result<T> {
    let xml_start = text.find('<').unwrap_or(0);
    let xml_end = text
        .rfind('>')
        .map(|i| i + 1)
        .filter(|&end| end > xml_start)
        .unwrap_or(text.len());
    let xml_content = &text[xml_start..xml_end];

    from_str(xml_content).map_err(|e| anyhow!("错误为：{e}\n模型返回的内容为：\n{xml_content}"))
}

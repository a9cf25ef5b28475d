use crate::{
    llm::{LlmBool, LlmClient, LlmPrompt},
    mute::history::{ActionRecord, ChatLine},
};
use anyhow::Result;
use async_trait::async_trait;
use genai::chat::ChatMessage;
use serde::Deserialize;
use std::{fmt::Write, sync::Arc};
use tracing::info;

const STRICT_RULES: &str = r#"禁言/解除禁言的严格条件：

使用禁言的情况：
1. 群主或管理员明确要求禁言某用户
2. 用户出现严重扰乱群聊秩序的行为（如刷屏、恶意挑衅等）
3. 用户发布违法违规内容需要及时制止
4. 用户被多次警告无效后需要临时禁言

使用解除禁言的情况：
1. 群主或管理员明确要求解除某用户禁言
2. 管理员误操作禁言需要解除
3. 用户已认识到错误并请求解除禁言

绝对不要使用的情况：
1. 没有明确授权的情况下擅自禁言/解除禁言用户
2. 对正常发言的用户随意禁言"#;

const RELAXED_RULES: &str = r#"当群聊里有人要求禁言/解除禁言某个用户，或者有人明显在扰乱群聊秩序时，可以执行禁言/解除禁言。
对正常发言的用户不要随意禁言。"#;

/// 判定是否要禁言时交给模型看的上下文。
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    pub group_id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: String,
    pub message: String,
    pub recent_lines: Vec<ChatLine>,
    pub recent_actions: Vec<ActionRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MuteDecision {
    pub act: LlmBool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LlmPrompt for MuteDecision {
    fn get_prompt_schema() -> &'static str {
        r#"<decision>
  <act>true 或 false，是否执行禁言/解除禁言</act>
  <user_id>需要禁言/解除禁言的用户ID或用户名，仔细思考不要弄错对象</user_id>
  <duration>禁言时长（秒），0表示解除禁言，范围：0-2592000</duration>
  <reason>禁言/解除禁言的理由，一句话</reason>
</decision>
act 为 false 时其余字段可以省略。"#
    }

    fn root_name() -> &'static str {
        "decision"
    }
}

/// 决定这条消息要不要触发禁言，以及对谁、多久。
#[async_trait]
pub trait ActionPlanner: Send + Sync {
    async fn plan(&self, context: &PlanContext) -> Result<MuteDecision>;
}

pub struct LlmPlanner {
    llm: Arc<LlmClient>,
    strict: bool,
}

impl LlmPlanner {
    pub fn new(llm: Arc<LlmClient>, strict: bool) -> Self {
        LlmPlanner { llm, strict }
    }
}

#[async_trait]
impl ActionPlanner for LlmPlanner {
    async fn plan(&self, context: &PlanContext) -> Result<MuteDecision> {
        let rules = if self.strict { STRICT_RULES } else { RELAXED_RULES };
        let prompt = vec![
            ChatMessage::system(
                "你是QQ群里的机器人，负责在合适的时候禁言或解除禁言群成员。",
            ),
            ChatMessage::system(rules),
            ChatMessage::system(render_context(context)),
            ChatMessage::user(format!(
                "{}({}) 说：{}",
                context.sender_name,
                context.sender_id.unwrap_or_default(),
                context.message
            )),
        ];

        let decision = self.llm.ask_as::<MuteDecision>(prompt).await?;
        info!("LLM 判定结果: {:?}", decision);
        Ok(decision)
    }
}

/// 最近的聊天和动作拼成一段纯文本
pub fn render_context(context: &PlanContext) -> String {
    let mut out = String::from("群内最近的聊天记录：\n");
    if context.recent_lines.is_empty() {
        out.push_str("（无）\n");
    }
    for line in &context.recent_lines {
        let _ = writeln!(out, "[{}({})]: {}", line.name, line.user_id, line.text);
    }

    if !context.recent_actions.is_empty() {
        out.push_str("\n你最近执行过的动作：\n");
        for action in &context.recent_actions {
            let _ = writeln!(out, "- {}", action.display);
        }
    }
    out
}

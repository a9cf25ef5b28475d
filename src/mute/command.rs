use crate::{
    config::Config,
    mute::{
        ChatSink, MuteError, MuteKind, MutePipeline, Trigger,
        duration::RawDuration,
        moderation::FailureClass,
        permission::{PermissionDecision, PermissionGate},
        pipeline::{Invocation, MuteOperation, MuteRequest},
    },
};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub kind: MuteKind,
    pub target: String,
    pub duration: Option<String>,
    pub reason: Option<String>,
}

/// `/mute <目标> [时长] [理由]` 与 `/unmute <目标>`，按发起人授权。
pub struct MuteCommand {
    config: Arc<Config>,
    gate: PermissionGate,
    pattern: Regex,
    pipeline: Arc<MutePipeline>,
}

impl MuteCommand {
    pub fn new(config: Arc<Config>, pipeline: Arc<MutePipeline>) -> Result<Self> {
        let prefix = regex::escape(&config.bot.command_prefix);
        let pattern = Regex::new(&format!(
            r"(?s)^{prefix}(?P<command>mute|unmute)\s+(?P<target>\S+)(?:\s+(?P<duration>\d+))?(?:\s+(?P<reason>.+))?$"
        ))?;
        let gate = PermissionGate::user(&config.permissions.allowed_users);
        Ok(MuteCommand {
            config,
            gate,
            pattern,
            pipeline,
        })
    }

    /// 格式不对时返回 `None`，时长必须是纯数字，理由可以带空格。
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let caps = self.pattern.captures(text.trim())?;
        let kind = match &caps["command"] {
            "unmute" => MuteKind::Unmute,
            _ => MuteKind::Mute,
        };
        Some(ParsedCommand {
            kind,
            target: caps["target"].to_string(),
            duration: caps.name("duration").map(|m| m.as_str().to_string()),
            reason: caps
                .name("reason")
                .map(|m| m.as_str().trim().to_string())
                .filter(|r| !r.is_empty()),
        })
    }

    pub async fn handle(&self, chat: &dyn ChatSink, trigger: &Trigger) -> Result<String, MuteError> {
        let mut invocation = Invocation {
            platform: trigger.platform.clone(),
            group_id: trigger.group_id,
            actor_id: trigger.actor_id,
            ..Default::default()
        };

        match self.parse(&trigger.text) {
            Some(parsed) => {
                info!(
                    "收到禁言命令: {:?} {} {:?}",
                    parsed.kind, parsed.target, parsed.duration
                );
                invocation.target_raw = Some(parsed.target);
                invocation.duration = RawDuration::from(parsed.duration);
                invocation.reason = parsed.reason;
                invocation.forced_unmute = parsed.kind == MuteKind::Unmute;
            }
            None => info!("禁言命令格式不完整: {}", trigger.text),
        }

        let result = self.pipeline.execute(self, chat, invocation).await;
        // 其余错误在流水线里已经回复过了。这里只剩某条提示没发出去的情况，
        // 通常是 NapCat 拒收了那条消息，换一句简短的错误提示再试一次，仍失败就只记日志。
        if let Err(MuteError::Chat(e)) = &result {
            error!("禁言命令执行失败: {:#}", e);
            if let Err(e) = chat.send_text(&format!("❌ 禁言命令错误: {e}")).await {
                error!("发送错误提示失败: {:#}", e);
            }
        }
        result
    }
}

#[async_trait]
impl MuteOperation for MuteCommand {
    fn name(&self) -> &'static str {
        "mute_command"
    }

    fn default_duration(&self) -> u32 {
        self.config.mute_command.default_duration
    }

    fn check_permission(&self, invocation: &Invocation) -> PermissionDecision {
        self.gate.check(&invocation.platform, invocation.actor_id)
    }

    fn missing_target_notice(&self) -> String {
        "❌ 命令参数不完整，请检查格式".to_string()
    }

    fn not_found_notice(&self, target: &str) -> String {
        format!("❌ 找不到用户 '{target}'")
    }

    fn lookup_failed_notice(&self, target: &str) -> String {
        format!("❌ 查找用户 '{target}' 时出错，请稍后再试")
    }

    fn missing_group_notice(&self) -> String {
        "❌ 无法获取群聊ID".to_string()
    }

    fn failure_notice(&self, class: FailureClass) -> String {
        let detail = match class {
            FailureClass::Http => "API请求失败",
            FailureClass::Api => "API返回失败",
            FailureClass::Transport => "API异常",
        };
        format!("❌ 发送禁言命令失败（{detail}）")
    }

    async fn on_denied(
        &self,
        chat: &dyn ChatSink,
        _invocation: &Invocation,
        reason: &str,
    ) -> Result<()> {
        chat.send_text(&format!("❌ {reason}")).await
    }

    async fn on_success(
        &self,
        chat: &dyn ChatSink,
        _request: &MuteRequest,
        message: String,
    ) -> Result<()> {
        chat.send_text(&message).await
    }
}

use crate::{
    config::{Config, KeywordSensitivity},
    llm::{ActionPlanner, PlanContext, ReplyRewriter},
    mute::{
        ChatSink, GroupLog, MuteError, MuteKind, MutePipeline, Trigger,
        duration::{self, RawDuration},
        moderation::FailureClass,
        permission::{PermissionDecision, PermissionGate},
        pipeline::{Invocation, MuteOperation, MuteRequest},
    },
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DENIED_REASON: &str = "表达自己没有在这个群禁言用户的能力";

/// 由模型判定触发的禁言，按群授权，回复会先交给模型改写。
pub struct SmartMuteAction {
    config: Arc<Config>,
    gate: PermissionGate,
    keywords: Vec<String>,
    planner: Arc<dyn ActionPlanner>,
    rewriter: Arc<dyn ReplyRewriter>,
    log: Arc<GroupLog>,
    pipeline: Arc<MutePipeline>,
}

impl SmartMuteAction {
    pub fn new(
        config: Arc<Config>,
        planner: Arc<dyn ActionPlanner>,
        rewriter: Arc<dyn ReplyRewriter>,
        log: Arc<GroupLog>,
        pipeline: Arc<MutePipeline>,
    ) -> Self {
        let gate = PermissionGate::group(&config.permissions.allowed_groups);
        let keywords = config
            .smart_mute
            .activation_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        SmartMuteAction {
            config,
            gate,
            keywords,
            planner,
            rewriter,
            log,
            pipeline,
        }
    }

    /// 关键词不区分大小写；`low` 还要求 @ 机器人，`high` 只 @ 也行。
    pub fn is_activated(&self, trigger: &Trigger) -> bool {
        let text = trigger.text.to_lowercase();
        let hit = self.keywords.iter().any(|k| text.contains(k.as_str()));
        match self.config.smart_mute.keyword_sensitivity {
            KeywordSensitivity::Low => hit && trigger.mentions_bot,
            KeywordSensitivity::Normal => hit,
            KeywordSensitivity::High => hit || trigger.mentions_bot,
        }
    }

    /// 未激活或模型判定不需要时返回 `None`。
    pub async fn handle(
        &self,
        chat: &dyn ChatSink,
        trigger: &Trigger,
    ) -> Result<Option<Result<String, MuteError>>> {
        if !self.is_activated(trigger) {
            return Ok(None);
        }
        let Some(group_id) = trigger.group_id else {
            debug!("私聊消息不触发智能禁言");
            return Ok(None);
        };

        info!("执行智能禁言判定");
        let context = PlanContext {
            group_id,
            sender_id: trigger.actor_id,
            sender_name: trigger.sender_name.clone(),
            message: trigger.text.clone(),
            recent_lines: self
                .log
                .recent_lines(group_id, self.config.smart_mute.context_messages),
            recent_actions: self.log.recent_actions(group_id),
        };

        let decision = self.planner.plan(&context).await?;
        if !*decision.act {
            debug!("模型判定不需要禁言");
            return Ok(None);
        }

        let invocation = Invocation {
            platform: trigger.platform.clone(),
            group_id: Some(group_id),
            actor_id: trigger.actor_id,
            target_raw: decision.user_id,
            duration: RawDuration::from(decision.duration),
            reason: decision.reason,
            forced_unmute: false,
        };
        Ok(Some(self.pipeline.execute(self, chat, invocation).await))
    }

    /// 改写失败或结果为空时发原句
    async fn send_rewritten(&self, chat: &dyn ChatSink, raw: &str, reason: &str) -> Result<()> {
        let segments = match self.rewriter.rewrite(raw, reason).await {
            Ok(segments) if !segments.is_empty() => segments,
            Ok(_) => vec![raw.to_string()],
            Err(e) => {
                warn!("改写回复失败，发送原句: {:#}", e);
                vec![raw.to_string()]
            }
        };
        for segment in segments {
            chat.send_text(&segment).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MuteOperation for SmartMuteAction {
    fn name(&self) -> &'static str {
        "smart_mute"
    }

    fn default_duration(&self) -> u32 {
        self.config.smart_mute.default_duration
    }

    fn check_permission(&self, invocation: &Invocation) -> PermissionDecision {
        self.gate.check(&invocation.platform, invocation.group_id)
    }

    fn missing_target_notice(&self) -> String {
        "没有指定要禁言的用户呢~".to_string()
    }

    fn not_found_notice(&self, target: &str) -> String {
        format!("找不到用户 '{target}' 呢~")
    }

    fn missing_group_notice(&self) -> String {
        "执行禁言动作失败（群ID缺失）".to_string()
    }

    fn failure_notice(&self, class: FailureClass) -> String {
        let detail = match class {
            FailureClass::Http => "API请求失败",
            FailureClass::Api => "API返回失败",
            FailureClass::Transport => "API异常",
        };
        format!("执行禁言动作失败（{detail}）")
    }

    async fn on_denied(
        &self,
        chat: &dyn ChatSink,
        invocation: &Invocation,
        _reason: &str,
    ) -> Result<()> {
        let target = invocation.target_raw.as_deref().unwrap_or_default().trim();
        let kind = MuteKind::from_duration(duration::normalize(
            &invocation.duration,
            self.default_duration(),
        ));

        let raw = format!("我想{}用户 {}，但是我没有权限", kind.label(), target);
        // 拒绝时改写失败就不说话
        match self.rewriter.rewrite(&raw, DENIED_REASON).await {
            Ok(segments) => {
                for segment in segments {
                    chat.send_text(&segment).await?;
                }
            }
            Err(e) => warn!("改写无权限回复失败: {:#}", e),
        }

        if let Some(group_id) = invocation.group_id {
            self.log.record_action(
                group_id,
                format!("尝试{}用户 {}，但是没有权限，无法操作", kind.label(), target),
            );
        }
        Ok(())
    }

    async fn on_success(
        &self,
        chat: &dyn ChatSink,
        request: &MuteRequest,
        message: String,
    ) -> Result<()> {
        self.send_rewritten(chat, &message, &request.reason).await
    }
}

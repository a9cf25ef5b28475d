use crate::{
    config::Config,
    mute::{
        GroupLog, MuteKind,
        duration::{self, RawDuration},
        identity::{IdentityResolver, PersonDirectory, ResolveError},
        moderation::{FailureClass, Moderation, ModerationError, SetGroupBan},
        permission::PermissionDecision,
        template::TemplateRenderer,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, error, field, info, info_span, warn};

pub const DEFAULT_REASON: &str = "管理员操作";

/// 往触发消息所在的会话里回一句话。
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_text(&self, text: &str) -> anyhow::Result<()>;
}

/// 入口层整理好的一次调用，字段都还没校验。
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub platform: String,
    pub group_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub target_raw: Option<String>,
    pub duration: RawDuration,
    pub reason: Option<String>,
    /// `/unmute` 不看时长参数，直接按 0 处理
    pub forced_unmute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteRequest {
    pub target_raw: String,
    pub resolved_user_id: String,
    pub duration_seconds: u32,
    pub reason: String,
    pub group_id: String,
    pub platform: String,
    pub actor_id: Option<i64>,
}

impl MuteRequest {
    pub fn kind(&self) -> MuteKind {
        MuteKind::from_duration(self.duration_seconds)
    }
}

#[derive(Debug, Error)]
pub enum MuteError {
    #[error("没有指定目标用户")]
    MissingTarget,
    #[error("权限不足: {0}")]
    PermissionDenied(String),
    #[error("找不到用户 '{0}'")]
    UserNotFound(String),
    #[error("查询用户 '{target}' 失败: {cause:#}")]
    DirectoryLookup { target: String, cause: anyhow::Error },
    #[error("无法获取群聊ID")]
    MissingGroup,
    #[error(transparent)]
    Moderation(#[from] ModerationError),
    #[error("发送消息失败: {0:#}")]
    Chat(anyhow::Error),
}

/// 两个入口各自的权限规则、默认时长和提示文案。
#[async_trait]
pub trait MuteOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn default_duration(&self) -> u32;

    fn check_permission(&self, invocation: &Invocation) -> PermissionDecision;

    fn missing_target_notice(&self) -> String;

    fn not_found_notice(&self, target: &str) -> String;

    fn lookup_failed_notice(&self, target: &str) -> String {
        format!("查找用户 '{target}' 时出错了，请稍后再试")
    }

    fn missing_group_notice(&self) -> String;

    fn failure_notice(&self, class: FailureClass) -> String;

    async fn on_denied(
        &self,
        chat: &dyn ChatSink,
        invocation: &Invocation,
        reason: &str,
    ) -> anyhow::Result<()>;

    async fn on_success(
        &self,
        chat: &dyn ChatSink,
        request: &MuteRequest,
        message: String,
    ) -> anyhow::Result<()>;
}

/// 校验 → 授权 → 解析目标 → 规整时长 → 调用接口 → 回复，两个入口共用。
pub struct MutePipeline {
    config: Arc<Config>,
    resolver: IdentityResolver,
    renderer: TemplateRenderer,
    moderation: Arc<dyn Moderation>,
    log: Arc<GroupLog>,
}

async fn notify(chat: &dyn ChatSink, text: &str) -> Result<(), MuteError> {
    chat.send_text(text).await.map_err(MuteError::Chat)
}

impl MutePipeline {
    pub fn new(
        config: Arc<Config>,
        directory: Arc<dyn PersonDirectory>,
        moderation: Arc<dyn Moderation>,
        log: Arc<GroupLog>,
    ) -> Self {
        let renderer = TemplateRenderer::new(&config.mute);
        MutePipeline {
            config,
            resolver: IdentityResolver::new(directory),
            renderer,
            moderation,
            log,
        }
    }

    pub async fn execute<O: MuteOperation>(
        &self,
        op: &O,
        chat: &dyn ChatSink,
        invocation: Invocation,
    ) -> Result<String, MuteError> {
        let logging = &self.config.logging;
        let span = info_span!(
            "mute",
            prefix = %logging.prefix,
            entry = op.name(),
            actor = field::Empty,
            target = field::Empty,
            duration = field::Empty,
        );
        if logging.include_user_info {
            if let Some(actor) = invocation.actor_id {
                span.record("actor", actor);
            }
        }
        if logging.include_action_info {
            span.record(
                "target",
                invocation.target_raw.as_deref().unwrap_or_default(),
            );
            span.record("duration", field::display(&invocation.duration));
        }

        self.run(op, chat, invocation).instrument(span).await
    }

    async fn run<O: MuteOperation>(
        &self,
        op: &O,
        chat: &dyn ChatSink,
        invocation: Invocation,
    ) -> Result<String, MuteError> {
        let Some(target) = invocation
            .target_raw
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            error!("目标用户为空");
            notify(chat, &op.missing_target_notice()).await?;
            return Err(MuteError::MissingTarget);
        };

        if let PermissionDecision::Denied(reason) = op.check_permission(&invocation) {
            warn!("权限检查失败: {}", reason);
            op.on_denied(chat, &invocation, &reason)
                .await
                .map_err(MuteError::Chat)?;
            return Err(MuteError::PermissionDenied(reason));
        }

        let user_id = match self.resolver.resolve(target).await {
            Ok(user_id) => user_id,
            Err(ResolveError::NotFound(name)) => {
                error!("找不到用户: {}", name);
                notify(chat, &op.not_found_notice(&name)).await?;
                return Err(MuteError::UserNotFound(name));
            }
            Err(ResolveError::Lookup { target, cause }) => {
                error!("查询用户 '{}' 时出错: {:#}", target, cause);
                notify(chat, &op.lookup_failed_notice(&target)).await?;
                return Err(MuteError::DirectoryLookup { target, cause });
            }
        };

        let duration_seconds = if invocation.forced_unmute {
            0
        } else {
            duration::normalize(&invocation.duration, op.default_duration())
        };
        let reason = invocation
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON)
            .to_string();

        let Some(group_id) = invocation.group_id else {
            error!("无法获取群聊ID");
            notify(chat, &op.missing_group_notice()).await?;
            return Err(MuteError::MissingGroup);
        };

        let request = MuteRequest {
            target_raw: target.to_string(),
            resolved_user_id: user_id,
            duration_seconds,
            reason,
            group_id: group_id.to_string(),
            platform: invocation.platform.clone(),
            actor_id: invocation.actor_id,
        };
        let kind = request.kind();
        let ban = SetGroupBan {
            group_id: request.group_id.clone(),
            user_id: request.resolved_user_id.clone(),
            duration: duration_seconds,
        };

        if let Err(e) = self.moderation.set_group_ban(&request.platform, &ban).await {
            error!("{}用户 {} 失败: {}", kind.label(), request.resolved_user_id, e);
            notify(chat, &op.failure_notice(e.class())).await?;
            return Err(MuteError::Moderation(e));
        }

        info!(
            "成功{}用户 {}，群: {}，时长: {} 秒",
            kind.label(),
            request.resolved_user_id,
            request.group_id,
            duration_seconds
        );

        let message = self.renderer.render(
            kind,
            &request.resolved_user_id,
            duration_seconds,
            &request.reason,
        );
        self.log.record_action(
            group_id,
            format!(
                "{}用户 {}，时长：{}，原因：{}",
                kind.label(),
                request.resolved_user_id,
                duration::display(duration_seconds),
                request.reason
            ),
        );

        // 禁言已经生效，回复失败只记日志
        if let Err(e) = op.on_success(chat, &request, message).await {
            warn!("发送禁言结果失败: {:#}", e);
        }

        Ok(format!(
            "成功{}用户 {}",
            kind.label(),
            request.resolved_user_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mute::{
        moderation::ModerationOutcome,
        permission::PermissionGate,
        testing::{FakeDirectory, FakeModeration, RecordingChat},
    };
    use std::sync::atomic::Ordering;

    /// 最简单的入口：按用户授权，失败时只回一句固定的话
    struct PlainOperation {
        gate: PermissionGate,
    }

    #[async_trait]
    impl MuteOperation for PlainOperation {
        fn name(&self) -> &'static str {
            "plain"
        }
        fn default_duration(&self) -> u32 {
            600
        }
        fn check_permission(&self, invocation: &Invocation) -> PermissionDecision {
            self.gate.check(&invocation.platform, invocation.actor_id)
        }
        fn missing_target_notice(&self) -> String {
            "缺少目标".to_string()
        }
        fn not_found_notice(&self, target: &str) -> String {
            format!("没有 {target}")
        }
        fn missing_group_notice(&self) -> String {
            "没有群".to_string()
        }
        fn failure_notice(&self, class: FailureClass) -> String {
            format!("失败 {class:?}")
        }
        async fn on_denied(
            &self,
            chat: &dyn ChatSink,
            _invocation: &Invocation,
            reason: &str,
        ) -> anyhow::Result<()> {
            chat.send_text(reason).await
        }
        async fn on_success(
            &self,
            chat: &dyn ChatSink,
            _request: &MuteRequest,
            message: String,
        ) -> anyhow::Result<()> {
            chat.send_text(&message).await
        }
    }

    fn config() -> Arc<Config> {
        let mut config = Config::default();
        config.mute.templates.mute = vec!["禁言 {target} {duration} {reason}".to_string()];
        config.mute.templates.unmute = vec!["解禁 {target}".to_string()];
        Arc::new(config)
    }

    fn invocation(target: Option<&str>, duration: RawDuration) -> Invocation {
        Invocation {
            platform: "qq".to_string(),
            group_id: Some(987_654_321),
            actor_id: Some(10001),
            target_raw: target.map(str::to_string),
            duration,
            reason: None,
            forced_unmute: false,
        }
    }

    struct Fixture {
        pipeline: MutePipeline,
        directory: Arc<FakeDirectory>,
        moderation: Arc<FakeModeration>,
        log: Arc<GroupLog>,
    }

    fn fixture(directory: FakeDirectory, moderation: FakeModeration) -> Fixture {
        let directory = Arc::new(directory);
        let moderation = Arc::new(moderation);
        let log = Arc::new(GroupLog::new());
        let pipeline = MutePipeline::new(
            config(),
            directory.clone(),
            moderation.clone(),
            log.clone(),
        );
        Fixture {
            pipeline,
            directory,
            moderation,
            log,
        }
    }

    fn open_gate() -> PlainOperation {
        PlainOperation {
            gate: PermissionGate::user(&[]),
        }
    }

    #[tokio::test]
    async fn zero_duration_unmutes() {
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::default();

        let result = f
            .pipeline
            .execute(
                &open_gate(),
                &chat,
                invocation(Some("12345"), RawDuration::Integer(0)),
            )
            .await
            .unwrap();

        assert_eq!(result, "成功解除禁言用户 12345");
        assert_eq!(chat.sent(), vec!["解禁 12345"]);
        assert_eq!(
            f.moderation.calls(),
            vec![SetGroupBan {
                group_id: "987654321".to_string(),
                user_id: "12345".to_string(),
                duration: 0,
            }]
        );
        assert_eq!(f.directory.name_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.log.recent_actions(987_654_321).len(), 1);
    }

    #[tokio::test]
    async fn default_reason_and_duration_are_filled() {
        let f = fixture(FakeDirectory::with_person("张三", "10086"), FakeModeration::ok());
        let chat = RecordingChat::default();

        f.pipeline
            .execute(&open_gate(), &chat, invocation(Some("@张三"), RawDuration::Missing))
            .await
            .unwrap();

        assert_eq!(chat.sent(), vec!["禁言 10086 10分钟 管理员操作"]);
        assert_eq!(f.moderation.calls()[0].duration, 600);
    }

    #[tokio::test]
    async fn forced_unmute_ignores_duration() {
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::default();
        let mut inv = invocation(Some("12345"), RawDuration::Text("3600".to_string()));
        inv.forced_unmute = true;

        f.pipeline.execute(&open_gate(), &chat, inv).await.unwrap();
        assert_eq!(f.moderation.calls()[0].duration, 0);
    }

    #[tokio::test]
    async fn unknown_name_stops_before_http() {
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::default();

        let err = f
            .pipeline
            .execute(&open_gate(), &chat, invocation(Some("张三"), RawDuration::Missing))
            .await
            .unwrap_err();

        assert!(matches!(err, MuteError::UserNotFound(ref name) if name == "张三"));
        assert_eq!(chat.sent(), vec!["没有 张三"]);
        assert!(f.moderation.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_target_is_rejected_first() {
        let op = PlainOperation {
            gate: PermissionGate::user(&["qq:1".to_string()]),
        };
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::default();

        let err = f
            .pipeline
            .execute(&op, &chat, invocation(Some("   "), RawDuration::Missing))
            .await
            .unwrap_err();
        assert!(matches!(err, MuteError::MissingTarget));
        assert_eq!(chat.sent(), vec!["缺少目标"]);
    }

    #[tokio::test]
    async fn denied_actor_never_reaches_directory() {
        let op = PlainOperation {
            gate: PermissionGate::user(&["qq:1".to_string()]),
        };
        let f = fixture(FakeDirectory::with_person("张三", "10086"), FakeModeration::ok());
        let chat = RecordingChat::default();

        let err = f
            .pipeline
            .execute(&op, &chat, invocation(Some("张三"), RawDuration::Missing))
            .await
            .unwrap_err();

        assert!(matches!(err, MuteError::PermissionDenied(_)));
        assert_eq!(chat.sent(), vec!["你没有使用禁言命令的权限"]);
        assert_eq!(f.directory.name_calls.load(Ordering::SeqCst), 0);
        assert!(f.moderation.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_group_is_reported() {
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::default();
        let mut inv = invocation(Some("12345"), RawDuration::Missing);
        inv.group_id = None;

        let err = f.pipeline.execute(&open_gate(), &chat, inv).await.unwrap_err();
        assert!(matches!(err, MuteError::MissingGroup));
        assert_eq!(chat.sent(), vec!["没有群"]);
        assert!(f.moderation.calls().is_empty());
    }

    #[tokio::test]
    async fn api_failure_sends_no_confirmation() {
        let outcome = ModerationOutcome {
            success: false,
            http_status: 200,
            api_status: "failed".to_string(),
            api_retcode: 102,
            raw_body: r#"{"status":"failed","retcode":102}"#.to_string(),
        };
        let f = fixture(
            FakeDirectory::default(),
            FakeModeration::failing(ModerationError::Api(outcome)),
        );
        let chat = RecordingChat::default();

        let err = f
            .pipeline
            .execute(&open_gate(), &chat, invocation(Some("12345"), RawDuration::Missing))
            .await
            .unwrap_err();

        assert!(matches!(err, MuteError::Moderation(_)));
        assert_eq!(chat.sent(), vec!["失败 Api"]);
        assert!(f.log.recent_actions(987_654_321).is_empty());
    }

    #[tokio::test]
    async fn reply_failure_after_success_is_not_an_error() {
        let f = fixture(FakeDirectory::default(), FakeModeration::ok());
        let chat = RecordingChat::broken();

        let result = f
            .pipeline
            .execute(&open_gate(), &chat, invocation(Some("12345"), RawDuration::Missing))
            .await;
        assert!(result.is_ok());
        assert_eq!(f.moderation.calls().len(), 1);
    }
}

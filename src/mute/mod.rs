pub mod action;
pub mod command;
pub mod directory;
pub mod duration;
pub mod history;
pub mod identity;
pub mod moderation;
pub mod permission;
pub mod pipeline;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

use crate::{
    config::Config,
    llm::{ActionPlanner, LlmClient, LlmPlanner, LlmRewriter, ReplyRewriter, Verbatim},
};
use anyhow::Result;
use std::{fmt, sync::Arc};

pub use action::SmartMuteAction;
pub use command::MuteCommand;
pub use directory::MemberDirectory;
pub use history::GroupLog;
pub use moderation::{HttpModeration, Moderation};
pub use pipeline::{ChatSink, MuteError, MutePipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteKind {
    Mute,
    Unmute,
}

impl MuteKind {
    pub fn from_duration(seconds: u32) -> Self {
        if seconds == 0 {
            MuteKind::Unmute
        } else {
            MuteKind::Mute
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MuteKind::Mute => "禁言",
            MuteKind::Unmute => "解除禁言",
        }
    }
}

/// 从一条聊天消息里提取出的、两个入口都需要的信息。
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    pub platform: String,
    pub group_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub sender_name: String,
    pub text: String,
    pub mentions_bot: bool,
}

/// 启动时构造一次，所有事件共享。配置只读。
pub struct MuteService {
    pub config: Arc<Config>,
    pub directory: Arc<MemberDirectory>,
    pub log: Arc<GroupLog>,
    pub action: SmartMuteAction,
    pub command: MuteCommand,
}

impl fmt::Debug for MuteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuteService")
            .field("members", &self.directory.len())
            .finish_non_exhaustive()
    }
}

impl MuteService {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let moderation = Arc::new(HttpModeration::new(&config.moderation)?);
        let llm = Arc::new(LlmClient::new(&config.llm));
        let planner = Arc::new(LlmPlanner::new(llm.clone(), config.smart_mute.strict_mode));
        let rewriter: Arc<dyn ReplyRewriter> = if config.smart_mute.rewrite_replies {
            Arc::new(LlmRewriter::new(llm))
        } else {
            Arc::new(Verbatim)
        };
        Self::with_parts(config, moderation, planner, rewriter)
    }

    pub fn with_parts(
        config: Arc<Config>,
        moderation: Arc<dyn Moderation>,
        planner: Arc<dyn ActionPlanner>,
        rewriter: Arc<dyn ReplyRewriter>,
    ) -> Result<Self> {
        let directory = Arc::new(MemberDirectory::new());
        let log = Arc::new(GroupLog::new());
        let pipeline = Arc::new(MutePipeline::new(
            config.clone(),
            directory.clone(),
            moderation,
            log.clone(),
        ));

        let action = SmartMuteAction::new(
            config.clone(),
            planner,
            rewriter,
            log.clone(),
            pipeline.clone(),
        );
        let command = MuteCommand::new(config.clone(), pipeline)?;

        Ok(MuteService {
            config,
            directory,
            log,
            action,
            command,
        })
    }
}

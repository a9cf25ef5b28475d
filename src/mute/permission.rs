use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// 智能禁言动作按群授权
    Group,
    /// 禁言命令按发起人授权
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied(String),
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allowed)
    }
}

/// `platform:id` 白名单。空名单放行所有人，否则只接受逐字相等的条目。
#[derive(Debug, Clone)]
pub struct PermissionGate {
    scope: Scope,
    allowed: HashSet<String>,
}

impl PermissionGate {
    pub fn new(scope: Scope, allowed: &[String]) -> Self {
        PermissionGate {
            scope,
            allowed: allowed.iter().cloned().collect(),
        }
    }

    pub fn group(allowed: &[String]) -> Self {
        Self::new(Scope::Group, allowed)
    }

    pub fn user(allowed: &[String]) -> Self {
        Self::new(Scope::User, allowed)
    }

    /// `subject` 为群号或用户 QQ，拿不到时直接拒绝。
    pub fn check(&self, platform: &str, subject: Option<i64>) -> PermissionDecision {
        let Some(subject) = subject else {
            let reason = match self.scope {
                Scope::Group => "禁言动作只能在群聊中使用",
                Scope::User => "无法获取聊天流信息",
            };
            return PermissionDecision::Denied(reason.to_string());
        };

        let key = format!("{platform}:{subject}");

        if self.allowed.is_empty() {
            info!("{:?} 权限未配置，放行 {}", self.scope, key);
            return PermissionDecision::Allowed;
        }

        if self.allowed.contains(&key) {
            info!("{} 在白名单中", key);
            return PermissionDecision::Allowed;
        }

        warn!("{} 不在白名单中", key);
        PermissionDecision::Denied(
            match self.scope {
                Scope::Group => "当前群组没有使用禁言动作的权限",
                Scope::User => "你没有使用禁言命令的权限",
            }
            .to_string(),
        )
    }
}

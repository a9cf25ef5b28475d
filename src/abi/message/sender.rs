use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SenderPrivate {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SenderGroup {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
    pub card: Option<String>,
}

/// 群聊和私聊发送者的统一视图
#[derive(Debug, Clone, Default)]
pub struct Sender {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
    pub card: Option<String>,
}

impl Sender {
    /// 群名片优先，其次昵称，都没有时用 QQ 号
    pub fn display_name(&self) -> String {
        [self.card.as_deref(), self.nickname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.user_id.unwrap_or_default().to_string())
    }
}

impl From<&SenderGroup> for Sender {
    fn from(s: &SenderGroup) -> Self {
        Sender {
            user_id: s.user_id,
            nickname: s.nickname.clone(),
            card: s.card.clone(),
        }
    }
}

impl From<&SenderPrivate> for Sender {
    fn from(s: &SenderPrivate) -> Self {
        Sender {
            user_id: s.user_id,
            nickname: s.nickname.clone(),
            card: None,
        }
    }
}

//! 测试用的假目录、假接口和会记录消息的会话。

use crate::mute::{
    ChatSink,
    identity::PersonDirectory,
    moderation::{Moderation, ModerationError, ModerationOutcome, SetGroupBan},
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct FakeDirectory {
    pub names: HashMap<String, String>,
    pub user_ids: HashMap<String, String>,
    pub fail: bool,
    pub name_calls: AtomicUsize,
    pub value_calls: AtomicUsize,
}

impl FakeDirectory {
    pub(crate) fn with_person(name: &str, user_id: &str) -> Self {
        let person_id = format!("qq:{user_id}");
        let mut dir = FakeDirectory::default();
        dir.names.insert(name.to_string(), person_id.clone());
        dir.user_ids.insert(person_id, user_id.to_string());
        dir
    }
}

#[async_trait]
impl PersonDirectory for FakeDirectory {
    async fn person_id_by_name(&self, name: &str) -> Result<Option<String>> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("目录不可用"));
        }
        Ok(self.names.get(name).cloned())
    }

    async fn person_value(&self, person_id: &str, field: &str) -> Result<Option<String>> {
        self.value_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(field, "user_id");
        Ok(self.user_ids.get(person_id).cloned())
    }
}

/// 记下每次请求；`error` 为空时返回成功
pub(crate) struct FakeModeration {
    calls: Mutex<Vec<SetGroupBan>>,
    error: Mutex<Option<ModerationError>>,
}

impl FakeModeration {
    pub(crate) fn ok() -> Self {
        FakeModeration {
            calls: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    /// 第一次调用返回 `error`，之后成功
    pub(crate) fn failing(error: ModerationError) -> Self {
        FakeModeration {
            calls: Mutex::new(Vec::new()),
            error: Mutex::new(Some(error)),
        }
    }

    pub(crate) fn calls(&self) -> Vec<SetGroupBan> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Moderation for FakeModeration {
    async fn set_group_ban(
        &self,
        _platform: &str,
        request: &SetGroupBan,
    ) -> Result<ModerationOutcome, ModerationError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(ModerationOutcome {
            success: true,
            http_status: 200,
            api_status: "ok".to_string(),
            api_retcode: 0,
            raw_body: r#"{"status":"ok","retcode":0}"#.to_string(),
        })
    }
}

/// HTTP 层之前就失败的请求，分类为 Transport
pub(crate) async fn transport_error() -> ModerationError {
    let err = reqwest::Client::new()
        .post("not a url")
        .send()
        .await
        .unwrap_err();
    ModerationError::Transport(err)
}

pub(crate) fn http_error() -> ModerationError {
    ModerationError::HttpStatus {
        status: 500,
        body: "boom".to_string(),
    }
}

pub(crate) fn api_error() -> ModerationError {
    ModerationError::Api(ModerationOutcome {
        success: false,
        http_status: 200,
        api_status: "failed".to_string(),
        api_retcode: 102,
        raw_body: r#"{"status":"failed","retcode":102}"#.to_string(),
    })
}

#[derive(Default)]
pub(crate) struct RecordingChat {
    sent: Mutex<Vec<String>>,
    /// 还要失败的发送次数
    failures: AtomicUsize,
}

impl RecordingChat {
    /// 每次发送都失败
    pub(crate) fn broken() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// 前 `n` 次发送失败，之后正常
    pub(crate) fn failing_first(n: usize) -> Self {
        RecordingChat {
            failures: AtomicUsize::new(n),
            ..Default::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSink for RecordingChat {
    async fn send_text(&self, text: &str) -> Result<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("连接已断开"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

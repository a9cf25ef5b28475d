use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_LINES: usize = 30;
const MAX_ACTIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub user_id: i64,
    pub name: String,
    pub text: String,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub display: String,
    pub time: i64,
}

/// 每个群最近的聊天记录和禁言动作，供智能禁言判定时参考。
#[derive(Debug, Default)]
pub struct GroupLog {
    lines: DashMap<i64, VecDeque<ChatLine>>,
    actions: DashMap<i64, VecDeque<ActionRecord>>,
}

fn push_capped<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_back(item);
    while queue.len() > cap {
        queue.pop_front();
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

impl GroupLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self, group_id: i64, line: ChatLine) {
        let mut queue = self.lines.entry(group_id).or_default();
        push_capped(queue.value_mut(), line, MAX_LINES);
    }

    pub fn record_action(&self, group_id: i64, display: impl Into<String>) {
        let record = ActionRecord {
            display: display.into(),
            time: now(),
        };
        let mut queue = self.actions.entry(group_id).or_default();
        push_capped(queue.value_mut(), record, MAX_ACTIONS);
    }

    /// 最近 `limit` 条消息，按时间先后排列
    pub fn recent_lines(&self, group_id: i64, limit: usize) -> Vec<ChatLine> {
        self.lines
            .get(&group_id)
            .map(|q| q.iter().skip(q.len().saturating_sub(limit)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn recent_actions(&self, group_id: i64) -> Vec<ActionRecord> {
        self.actions
            .get(&group_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

use crate::mute::identity::PersonDirectory;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

/// 每个人最多记住的旧名字数
const MAX_USED_NAMES: usize = 8;

/// 当前名字和用过的名字分开记
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name {
    pub now: Option<String>,
    pub used: Vec<String>,
}

impl Name {
    /// 换名字时返回被换下来的旧名字
    fn set(&mut self, new: &str) -> Option<String> {
        if self.now.as_deref() == Some(new) {
            return None;
        }
        self.used.retain(|n| n != new);
        let old = self.now.replace(new.to_string());
        if let Some(old) = &old {
            self.used.push(old.clone());
        }
        old
    }

    /// 超出上限的旧名字，最早的先丢
    fn evict_used(&mut self) -> Vec<String> {
        let excess = self.used.len().saturating_sub(MAX_USED_NAMES);
        self.used.drain(..excess).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub person_id: String,
    pub platform: String,
    pub user_id: i64,
    pub nickname: Name,
    pub card: Name,
    pub last_group: Option<i64>,
}

impl PersonRecord {
    fn holds(&self, name: &str) -> bool {
        self.nickname.now.as_deref() == Some(name) || self.card.now.as_deref() == Some(name)
    }
}

/// 从群消息里认识的人。
///
/// 按名字找人时先看谁现在叫这个名字，没人叫了才看谁以前叫过。
#[derive(Debug, Default)]
pub struct MemberDirectory {
    /// 名字 -> 现在用这个名字的人，最近发言的在最后
    current: DashMap<String, Vec<String>>,
    /// 名字 -> 最近一个用过这个名字的人
    used: DashMap<String, String>,
    people: DashMap<String, PersonRecord>,
}

pub fn person_id(platform: &str, user_id: i64) -> String {
    format!("{platform}:{user_id}")
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        platform: &str,
        user_id: i64,
        nickname: Option<&str>,
        card: Option<&str>,
        group_id: Option<i64>,
    ) {
        let person_id = person_id(platform, user_id);
        let nickname = nickname.map(str::trim).filter(|n| !n.is_empty());
        let card = card.map(str::trim).filter(|c| !c.is_empty());

        let mut retired = Vec::new();
        let mut evicted = Vec::new();
        let mut still_held = Vec::new();
        {
            let mut entry = self
                .people
                .entry(person_id.clone())
                .or_insert_with(|| PersonRecord {
                    person_id: person_id.clone(),
                    platform: platform.to_string(),
                    user_id,
                    nickname: Name::default(),
                    card: Name::default(),
                    last_group: None,
                });
            let record = entry.value_mut();

            for (slot, value) in [(&mut record.nickname, nickname), (&mut record.card, card)] {
                let Some(value) = value else { continue };
                retired.extend(slot.set(value));
                evicted.extend(slot.evict_used());
            }
            if group_id.is_some() {
                record.last_group = group_id;
            }
            // 昵称换下来的名字可能正是现在的群名片
            retired.retain(|name| !record.holds(name));
            still_held.extend(record.nickname.now.clone());
            still_held.extend(record.card.now.clone());
            trace!(record = ?*record, "更新成员目录");
        }

        for name in still_held {
            let mut holders = self.current.entry(name).or_default();
            holders.retain(|id| id != &person_id);
            holders.push(person_id.clone());
        }

        for name in retired {
            if let Some(mut holders) = self.current.get_mut(&name) {
                holders.retain(|id| id != &person_id);
            }
            self.current.remove_if(&name, |_, holders| holders.is_empty());
            self.used.insert(name, person_id.clone());
        }

        for name in evicted {
            self.used.remove_if(&name, |_, id| id == &person_id);
        }
    }

    pub fn get(&self, person_id: &str) -> Option<PersonRecord> {
        self.people.get(person_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }
}

#[async_trait]
impl PersonDirectory for MemberDirectory {
    async fn person_id_by_name(&self, name: &str) -> Result<Option<String>> {
        let name = name.trim();
        let current = self
            .current
            .get(name)
            .and_then(|holders| holders.last().cloned());
        Ok(current.or_else(|| self.used.get(name).map(|id| id.value().clone())))
    }

    async fn person_value(&self, person_id: &str, field: &str) -> Result<Option<String>> {
        let Some(record) = self.people.get(person_id) else {
            return Ok(None);
        };
        Ok(match field {
            "user_id" => Some(record.user_id.to_string()),
            "platform" => Some(record.platform.clone()),
            "nickname" => record.nickname.now.clone(),
            "card" => record.card.now.clone(),
            _ => None,
        })
    }
}

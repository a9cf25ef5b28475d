use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// 按名字找人的用户目录。
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// 通过昵称/群名片查 person_id
    async fn person_id_by_name(&self, name: &str) -> Result<Option<String>>;
    /// 读取 person_id 对应的某个属性，如 `user_id`
    async fn person_value(&self, person_id: &str, field: &str) -> Result<Option<String>>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("找不到用户 '{0}'")]
    NotFound(String),
    #[error("查询用户 '{target}' 失败: {cause:#}")]
    Lookup {
        target: String,
        cause: anyhow::Error,
    },
}

#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn PersonDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn PersonDirectory>) -> Self {
        IdentityResolver { directory }
    }

    /// 纯数字直接当作 QQ 号；否则按名字查一次目录、再取一次 `user_id`。
    pub async fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
        let target = raw.trim();
        let target = target.strip_prefix('@').unwrap_or(target);

        if is_numeric_id(target) {
            return Ok(target.to_string());
        }

        info!("用户 '{}' 不是数字ID，尝试作为用户名查询", target);

        let lookup_failed = |cause| ResolveError::Lookup {
            target: target.to_string(),
            cause,
        };

        let Some(person_id) = self
            .directory
            .person_id_by_name(target)
            .await
            .map_err(lookup_failed)?
        else {
            warn!("无法通过用户名 '{}' 找到用户", target);
            return Err(ResolveError::NotFound(target.to_string()));
        };

        match self
            .directory
            .person_value(&person_id, "user_id")
            .await
            .map_err(lookup_failed)?
        {
            Some(user_id) if !user_id.is_empty() => {
                info!("成功将用户名 '{}' 解析为 user_id: {}", target, user_id);
                Ok(user_id)
            }
            _ => {
                warn!("找到了 person_id {} 但无法获取 user_id", person_id);
                Err(ResolveError::NotFound(target.to_string()))
            }
        }
    }
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mute::testing::FakeDirectory;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn numeric_target_skips_directory() {
        let dir = Arc::new(FakeDirectory::default());
        let resolver = IdentityResolver::new(dir.clone());
        for id in ["12345", "0", "007"] {
            assert_eq!(resolver.resolve(id).await.unwrap(), id);
        }
        assert_eq!(resolver.resolve("@12345").await.unwrap(), "12345");
        assert_eq!(dir.name_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dir.value_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn name_is_looked_up_once() {
        let dir = Arc::new(FakeDirectory::with_person("张三", "10086"));
        let resolver = IdentityResolver::new(dir.clone());
        assert_eq!(resolver.resolve("张三").await.unwrap(), "10086");
        assert_eq!(dir.name_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dir.value_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let dir = Arc::new(FakeDirectory::default());
        let resolver = IdentityResolver::new(dir.clone());
        let err = resolver.resolve("张三").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ref name) if name == "张三"));
        assert_eq!(dir.value_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn person_without_user_id_is_not_found() {
        let mut dir = FakeDirectory::with_person("张三", "10086");
        dir.user_ids.clear();
        let dir = Arc::new(dir);
        let resolver = IdentityResolver::new(dir.clone());
        assert!(matches!(
            resolver.resolve("张三").await,
            Err(ResolveError::NotFound(_))
        ));
        assert_eq!(dir.name_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dir.value_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn directory_error_is_distinct() {
        let dir = FakeDirectory {
            fail: true,
            ..Default::default()
        };
        let resolver = IdentityResolver::new(Arc::new(dir));
        assert!(matches!(
            resolver.resolve("张三").await,
            Err(ResolveError::Lookup { .. })
        ));
    }
}

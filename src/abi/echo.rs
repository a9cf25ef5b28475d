use anyhow::{Result, anyhow};
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time;
use tracing::debug;

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct Echo(u64);

impl Serialize for Echo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Echo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EchoVisitor;

        impl<'v> de::Visitor<'v> for EchoVisitor {
            type Value = Echo;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string representing a u64 echo id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<u64>()
                    .map(Echo)
                    .map_err(|_| de::Error::custom(format!("invalid echo format: {}", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Echo(v))
            }
        }

        deserializer.deserialize_any(EchoVisitor)
    }
}

/// 记录还在等响应的 API 调用，按 echo 把响应交回调用方。
#[derive(Debug)]
pub struct EchoRegistry {
    counter: AtomicU64,
    pending: DashMap<u64, oneshot::Sender<String>>,
    timeout: Duration,
}

impl Default for EchoRegistry {
    fn default() -> Self {
        Self::with_timeout(TIMEOUT)
    }
}

impl EchoRegistry {
    pub fn with_timeout(timeout: Duration) -> Self {
        EchoRegistry {
            counter: AtomicU64::new(1),
            pending: DashMap::new(),
            timeout,
        }
    }

    /// 分配新的 echo 并登记等待
    pub fn register(self: &Arc<Self>) -> EchoPending {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        EchoPending {
            echo: Echo(id),
            receiver: rx,
            registry: self.clone(),
        }
    }

    /// 找不到对应的等待方时返回 false
    pub fn resolve(&self, echo: &str, response: String) -> bool {
        let Ok(id) = echo.parse::<u64>() else {
            return false;
        };
        match self.pending.remove(&id) {
            Some((_, sender)) => sender.send(response).is_ok(),
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

pub struct EchoPending {
    echo: Echo,
    receiver: oneshot::Receiver<String>,
    registry: Arc<EchoRegistry>,
}

impl EchoPending {
    pub fn echo(&self) -> Echo {
        self.echo
    }

    pub async fn wait(mut self) -> Result<String> {
        match time::timeout(self.registry.timeout, &mut self.receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(anyhow!("收到的响应通道已关闭")),
            Err(_) => Err(anyhow!("等待 Echo 响应超时")),
        }
    }
}

/// 无论是拿到响应、超时还是请求根本没发出去，都要从表里清掉
impl Drop for EchoPending {
    fn drop(&mut self) {
        debug!("清理 Echo: {:?}", self.echo);
        self.registry.pending.remove(&self.echo.0);
    }
}

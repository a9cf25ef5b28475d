use crate::config::ModerationConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SetGroupBan {
    pub group_id: String,
    pub user_id: String,
    pub duration: u32,
}

/// 一次禁言请求的结果。响应体缺少 `status`/`retcode` 时分别记为空串和 -1。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub success: bool,
    pub http_status: u16,
    pub api_status: String,
    pub api_retcode: i64,
    pub raw_body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 非 200 状态码
    Http,
    /// 200 但 status/retcode 不对或响应体无法解析
    Api,
    /// 网络异常、超时
    Transport,
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Napcat API请求异常: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Napcat API请求失败: HTTP {status}")]
    HttpStatus { status: u16, body: String },
    #[error("Napcat API返回失败: {}", .0.raw_body)]
    Api(ModerationOutcome),
}

impl ModerationError {
    pub fn class(&self) -> FailureClass {
        match self {
            ModerationError::Transport(_) => FailureClass::Transport,
            ModerationError::HttpStatus { .. } => FailureClass::Http,
            ModerationError::Api(_) => FailureClass::Api,
        }
    }
}

#[async_trait]
pub trait Moderation: Send + Sync {
    async fn set_group_ban(
        &self,
        platform: &str,
        request: &SetGroupBan,
    ) -> Result<ModerationOutcome, ModerationError>;
}

/// 通过 NapCat 的 HTTP 接口禁言，只发一次，不重试。
#[derive(Debug, Clone)]
pub struct HttpModeration {
    client: Client,
    endpoint: String,
}

impl HttpModeration {
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpModeration {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Moderation for HttpModeration {
    async fn set_group_ban(
        &self,
        platform: &str,
        request: &SetGroupBan,
    ) -> Result<ModerationOutcome, ModerationError> {
        info!(
            "Napcat禁言API请求: {}, platform={}, payload={:?}",
            self.endpoint, platform, request
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Napcat API请求异常: {e}");
                ModerationError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(ModerationError::Transport)?;
        info!("Napcat禁言API响应: status={}, body={}", status, body);

        if status != StatusCode::OK {
            return Err(ModerationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let outcome = interpret(status.as_u16(), body);
        if outcome.success {
            Ok(outcome)
        } else {
            Err(ModerationError::Api(outcome))
        }
    }
}

fn interpret(http_status: u16, raw_body: String) -> ModerationOutcome {
    let parsed = serde_json::from_str::<Value>(&raw_body).ok();
    if parsed.is_none() {
        debug!("响应体不是 JSON");
    }

    let api_status = parsed
        .as_ref()
        .and_then(|v| v.get("status"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let api_retcode = parsed
        .as_ref()
        .and_then(|v| v.get("retcode"))
        .and_then(Value::as_i64)
        .unwrap_or(-1);

    ModerationOutcome {
        success: http_status == 200 && api_status == "ok" && api_retcode == 0,
        http_status,
        api_status,
        api_retcode,
        raw_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::post};
    use std::sync::{Arc, Mutex};

    fn ban(duration: u32) -> SetGroupBan {
        SetGroupBan {
            group_id: "987654321".to_string(),
            user_id: "12345".to_string(),
            duration,
        }
    }

    /// 起一个只返回固定响应的 set_group_ban 服务，并记下收到的请求体
    async fn mock_server(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/set_group_ban",
            post(move |Json(payload): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(payload);
                    (AxumStatus::from_u16(status).unwrap(), body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/set_group_ban"), received)
    }

    fn client(endpoint: String) -> HttpModeration {
        HttpModeration::new(&ModerationConfig {
            endpoint,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn ok_response_is_success() {
        let (url, received) = mock_server(200, r#"{"status":"ok","retcode":0,"data":null}"#).await;
        let outcome = client(url).set_group_ban("qq", &ban(600)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.http_status, 200);
        assert_eq!(outcome.api_retcode, 0);

        let payload = received.lock().unwrap().pop().unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"group_id": "987654321", "user_id": "12345", "duration": 600})
        );
    }

    #[tokio::test]
    async fn bad_retcode_is_api_failure() {
        let (url, _) = mock_server(200, r#"{"status":"failed","retcode":102}"#).await;
        let err = client(url).set_group_ban("qq", &ban(600)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Api);
        let ModerationError::Api(outcome) = err else {
            unreachable!()
        };
        assert_eq!(outcome.api_status, "failed");
        assert_eq!(outcome.api_retcode, 102);
    }

    #[tokio::test]
    async fn ok_status_with_nonzero_retcode_is_api_failure() {
        let (url, _) = mock_server(200, r#"{"status":"ok","retcode":1}"#).await;
        let err = client(url).set_group_ban("qq", &ban(60)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Api);
    }

    #[tokio::test]
    async fn malformed_body_is_api_failure() {
        let (url, _) = mock_server(200, "not json").await;
        let err = client(url).set_group_ban("qq", &ban(60)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Api);
    }

    #[tokio::test]
    async fn server_error_is_http_failure() {
        let (url, _) = mock_server(500, "boom").await;
        let err = client(url).set_group_ban("qq", &ban(60)).await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Http);
        assert_eq!(err.to_string(), "Napcat API请求失败: HTTP 500");
    }

    #[tokio::test]
    async fn refused_connection_is_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}/set_group_ban"))
            .set_group_ban("qq", &ban(60))
            .await
            .unwrap_err();
        assert_eq!(err.class(), FailureClass::Transport);
    }

    #[test]
    fn interpret_reads_status_and_retcode() {
        let outcome = interpret(200, r#"{"status":"ok","retcode":0}"#.to_string());
        assert!(outcome.success);
        let outcome = interpret(200, "{}".to_string());
        assert!(!outcome.success);
        assert_eq!(outcome.api_status, "");
        assert_eq!(outcome.api_retcode, -1);
    }
}

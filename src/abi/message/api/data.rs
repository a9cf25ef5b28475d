use crate::abi::echo::{Echo, EchoPending};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait Data: Send + Sync + 'static {}

pub trait ApiResponseTrait {}

pub struct ApiResponsePending<R> {
    pub echo: EchoPending,
    _marker: PhantomData<R>,
}

impl<R: ApiResponseTrait + for<'de> Deserialize<'de>> ApiResponsePending<R> {
    pub fn new(echo: EchoPending) -> Self {
        Self {
            echo,
            _marker: PhantomData,
        }
    }

    pub async fn wait_echo(self) -> Result<R> {
        let response_str = self.echo.wait().await?;
        let response = serde_json::from_str::<R>(&response_str)?;
        Ok(response)
    }
}

#[derive(Deserialize, Debug)]
pub struct ApiResponse<T: Data> {
    pub status: Status,
    #[serde(default)]
    pub retcode: i64,
    pub message: Option<String>,
    pub data: Option<T>,
    pub echo: Option<Echo>,
    pub wording: Option<String>,
}

impl<T: Data> ApiResponseTrait for ApiResponse<T> {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Async,
    Failed,
}

#[derive(Deserialize, Debug)]
pub struct SendMsgData {
    pub message_id: i64,
}

impl Data for SendMsgData {}

pub type SendMsgResponse = ApiResponse<SendMsgData>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_response_without_data() {
        let raw = r#"{"status":"failed","retcode":1200,"data":null,"message":"不是群成员","wording":"不是群成员","echo":"7"}"#;
        let res: SendMsgResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(res.status, Status::Failed);
        assert_eq!(res.retcode, 1200);
        assert!(res.data.is_none());
        assert_eq!(res.message.as_deref(), Some("不是群成员"));
    }

    #[test]
    fn ok_response() {
        let raw = r#"{"status":"ok","retcode":0,"data":{"message_id":123},"echo":"8"}"#;
        let res: SendMsgResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.data.unwrap().message_id, 123);
    }
}

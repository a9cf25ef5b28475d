use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::abi::message::{Params, api};

#[async_trait]
pub trait BotClient: Send + Sync {
    async fn call_api<T: Params + fmt::Debug>(
        &self,
        params: T,
    ) -> Result<api::ApiResponsePending<T::Response>>;
}

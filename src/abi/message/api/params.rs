use crate::abi::{
    echo::Echo,
    message::{MessageSend, api::data},
};
use helper::api;
use serde::{Deserialize, Serialize};

pub trait Params: Send + Sync + 'static + Serialize {
    type Response: data::ApiResponseTrait + for<'de> Deserialize<'de> + Send;

    const ACTION: &'static str;
}

#[derive(Serialize, Debug)]
pub struct ApiSend<T: Params> {
    pub action: &'static str,
    pub params: T,
    pub echo: Echo,
}

#[derive(Serialize, Debug)]
#[api("/send_group_msg", data::SendMsgResponse)]
pub struct SendGroupMessageParams {
    pub group_id: i64,
    pub message: MessageSend,
}

impl SendGroupMessageParams {
    pub const fn new(group_id: i64, message: MessageSend) -> Self {
        Self { group_id, message }
    }
}

#[derive(Serialize, Debug)]
#[api("/send_private_msg", data::SendMsgResponse)]
pub struct SendPrivateMessageParams {
    pub user_id: i64,
    pub message: MessageSend,
}

impl SendPrivateMessageParams {
    pub const fn new(user_id: i64, message: MessageSend) -> Self {
        Self { user_id, message }
    }
}

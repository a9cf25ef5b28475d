use serde::{Deserialize, Serialize};

use crate::abi::message::Sender;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    Group(i64),
    Private(i64),
}

impl Target {
    pub fn is_group(&self) -> bool {
        matches!(self, Target::Group(_))
    }

    pub fn group_id(&self) -> Option<i64> {
        match self {
            Target::Group(id) => Some(*id),
            Target::Private(_) => None,
        }
    }
}

pub trait MessageType {
    fn get_target(&self) -> Target;
    fn get_text(&self) -> String;
    fn get_sender(&self) -> Sender;
    fn get_self_id(&self) -> i64;
}

/// 只关心消息和元事件，通知、请求等统一落到 `Other`。
#[derive(Deserialize, Debug)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum Event {
    Message(Box<message::Message>),
    MetaEvent(meta::MetaEvent),
    #[serde(other)]
    Other,
}

pub mod message {
    use crate::abi::message::{MessageReceive, SenderGroup, SenderPrivate};

    use super::*;

    #[derive(Deserialize, Debug)]
    #[serde(tag = "message_type", rename_all = "snake_case")]
    pub enum Message {
        Private(Private),
        Group(Group),
    }

    impl Message {
        pub fn body(&self) -> &MessageReceive {
            match self {
                Message::Private(p) => &p.message,
                Message::Group(g) => &g.message,
            }
        }

        pub fn time(&self) -> i64 {
            match self {
                Message::Private(p) => p.time,
                Message::Group(g) => g.time,
            }
        }
    }

    impl MessageType for Message {
        fn get_target(&self) -> Target {
            match self {
                Message::Private(private) => Target::Private(private.user_id),
                Message::Group(group) => Target::Group(group.group_id),
            }
        }

        fn get_text(&self) -> String {
            self.body().get_text()
        }

        fn get_sender(&self) -> Sender {
            match self {
                Message::Group(g) => Sender::from(&g.sender),
                Message::Private(p) => Sender::from(&p.sender),
            }
        }

        fn get_self_id(&self) -> i64 {
            match self {
                Message::Private(p) => p.self_id,
                Message::Group(g) => g.self_id,
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct Private {
        pub time: i64,
        pub self_id: i64,
        pub message_id: i64,
        pub user_id: i64,
        pub message: MessageReceive,
        #[serde(default)]
        pub raw_message: String,
        #[serde(default)]
        pub sender: SenderPrivate,
    }

    #[derive(Deserialize, Debug)]
    pub struct Group {
        pub time: i64,
        pub self_id: i64,
        pub message_id: i64,
        pub group_id: i64,
        pub user_id: i64,
        pub message: MessageReceive,
        #[serde(default)]
        pub raw_message: String,
        #[serde(default)]
        pub sender: SenderGroup,
    }
}

pub mod meta {
    use super::*;

    #[derive(Serialize, Deserialize, Debug)]
    #[serde(rename_all = "snake_case", tag = "meta_event_type")]
    pub enum MetaEvent {
        Lifecycle(Lifecycle),
        Heartbeat(Heartbeat),
        #[serde(other)]
        Other,
    }

    #[derive(Serialize, Deserialize, Debug)]
    pub struct Lifecycle {
        pub time: i64,
        pub self_id: i64,
        pub sub_type: String,
    }

    #[derive(Serialize, Deserialize, Debug)]
    pub struct Heartbeat {
        pub time: i64,
        pub self_id: i64,
        pub interval: i64,
    }
}

#[cfg(test)]
mod tests {
    use super::{message::Message, *};

    #[test]
    fn group_message_event() {
        let raw = r#"{
            "time": 1700000000, "self_id": 10000, "post_type": "message",
            "message_type": "group", "sub_type": "normal", "message_id": 1,
            "group_id": 987654321, "user_id": 10001,
            "message": [{"type":"at","data":{"qq":"10000"}},{"type":"text","data":{"text":" 禁言张三"}}],
            "raw_message": "[CQ:at,qq=10000] 禁言张三", "font": 14,
            "sender": {"user_id": 10001, "nickname": "群主", "card": "", "role": "owner"}
        }"#;
        let Event::Message(msg) = serde_json::from_str::<Event>(raw).unwrap() else {
            panic!("不是消息事件");
        };
        assert_eq!(msg.get_target(), Target::Group(987_654_321));
        assert_eq!(msg.get_text(), "@10000 禁言张三");
        assert!(msg.body().mentions(msg.get_self_id()));
        assert_eq!(msg.get_sender().display_name(), "群主");
        assert!(matches!(*msg, Message::Group(_)));
    }

    #[test]
    fn unrelated_events_are_other() {
        let notice = r#"{"time":1,"self_id":1,"post_type":"notice","notice_type":"group_ban","group_id":1,"user_id":2,"operator_id":3,"duration":60,"sub_type":"ban"}"#;
        assert!(matches!(
            serde_json::from_str::<Event>(notice).unwrap(),
            Event::Other
        ));

        let heartbeat = r#"{"time":1,"self_id":1,"post_type":"meta_event","meta_event_type":"heartbeat","status":{"online":true,"good":true},"interval":30000}"#;
        assert!(matches!(
            serde_json::from_str::<Event>(heartbeat).unwrap(),
            Event::MetaEvent(meta::MetaEvent::Heartbeat(_))
        ));
    }
}

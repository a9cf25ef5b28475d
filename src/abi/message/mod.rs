pub mod api;
pub mod event_body;
mod message_body;
mod sender;

pub use api::Params;
pub use event_body::Event;
pub use event_body::message as event_message;
pub use event_body::meta as event_meta;
pub use event_body::{MessageType, Target};
pub use message_body::{MessageReceive, MessageSend, SegmentSend};
pub use sender::{Sender, SenderGroup, SenderPrivate};

pub fn from_str(s: impl Into<String>) -> MessageSend {
    MessageSend::Single(message_body::SegmentSend::Text(message_body::text::Data {
        text: s.into(),
    }))
}

/// 多段文本按行合并成一条消息
pub fn join_lines(messages: Vec<MessageSend>) -> MessageSend {
    let mut segments = Vec::new();
    for (i, msg) in messages.into_iter().enumerate() {
        if i > 0 {
            segments.push(SegmentSend::Text(message_body::text::Data {
                text: "\n".to_string(),
            }));
        }
        match msg {
            MessageSend::Array(arr) => segments.extend(arr),
            MessageSend::Single(seg) => segments.push(seg),
        }
    }
    MessageSend::Array(segments)
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// 收到的消息段，只解析用得上的 `text` 和 `at`，其余保留原始 `data`。
#[derive(Deserialize, Debug, Clone)]
pub struct SegmentReceive {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl SegmentReceive {
    fn field(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        (self.kind == "text").then(|| self.field("text")).flatten()
    }

    /// `at` 段的 QQ 号，@全体成员 时为 `all`
    pub fn at_target(&self) -> Option<String> {
        (self.kind == "at").then(|| self.field("qq")).flatten()
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageReceive {
    Array(Vec<SegmentReceive>),
    Single(SegmentReceive),
    /// CQ 码字符串格式，用到时再拆成消息段
    Text(String),
}

fn unescape(s: &str) -> String {
    s.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

fn push_text(segments: &mut Vec<SegmentReceive>, text: &str) {
    if !text.is_empty() {
        segments.push(SegmentReceive {
            kind: "text".to_string(),
            data: serde_json::json!({ "text": unescape(text) }),
        });
    }
}

/// `[CQ:at,qq=1]` 这类码拆成对应的段，其余部分是文本段。没闭合的 `[CQ:` 按文本处理。
fn parse_cq(raw: &str) -> Vec<SegmentReceive> {
    let mut segments = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find("[CQ:") {
        let Some(len) = rest[start..].find(']') else {
            break;
        };
        push_text(&mut segments, &rest[..start]);

        let mut parts = rest[start + 4..start + len].split(',');
        let kind = parts.next().unwrap_or_default().to_string();
        let data: Map<String, Value> = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_string(), Value::String(unescape(v))))
            .collect();
        segments.push(SegmentReceive {
            kind,
            data: Value::Object(data),
        });

        rest = &rest[start + len + 1..];
    }
    push_text(&mut segments, rest);
    segments
}

impl MessageReceive {
    fn segments(&self) -> Cow<'_, [SegmentReceive]> {
        match self {
            MessageReceive::Array(arr) => Cow::Borrowed(arr),
            MessageReceive::Single(seg) => Cow::Borrowed(std::slice::from_ref(seg)),
            MessageReceive::Text(raw) => Cow::Owned(parse_cq(raw)),
        }
    }

    /// 拼接文本，`at` 段写成 `@QQ号`
    pub fn get_text(&self) -> String {
        let mut result = String::new();
        for seg in self.segments().iter() {
            if let Some(text) = seg.text() {
                result.push_str(&text);
            } else if let Some(qq) = seg.at_target() {
                result.push('@');
                result.push_str(&qq);
            }
        }
        result
    }

    pub fn mentions(&self, user_id: i64) -> bool {
        let id = user_id.to_string();
        self.segments()
            .iter()
            .any(|seg| seg.at_target().as_deref() == Some(id.as_str()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SegmentSend {
    Text(text::Data),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageSend {
    Array(Vec<SegmentSend>),
    Single(SegmentSend),
}

pub mod text {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Data {
        pub text: String,
    }
}

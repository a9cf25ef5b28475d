use crate::llm::LlmClient;
use anyhow::{Result, bail};
use async_trait::async_trait;
use genai::chat::ChatMessage;
use std::sync::Arc;

/// 把固定句式的回复改写成更像人说的话，可能拆成几条发送。
#[async_trait]
pub trait ReplyRewriter: Send + Sync {
    async fn rewrite(&self, raw_reply: &str, reason: &str) -> Result<Vec<String>>;
}

/// 不改写，原样发出
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

#[async_trait]
impl ReplyRewriter for Verbatim {
    async fn rewrite(&self, raw_reply: &str, _reason: &str) -> Result<Vec<String>> {
        Ok(vec![raw_reply.to_string()])
    }
}

pub struct LlmRewriter {
    llm: Arc<LlmClient>,
}

impl LlmRewriter {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        LlmRewriter { llm }
    }
}

#[async_trait]
impl ReplyRewriter for LlmRewriter {
    async fn rewrite(&self, raw_reply: &str, reason: &str) -> Result<Vec<String>> {
        let prompt = vec![
            ChatMessage::system(
                "你是QQ群里的机器人。把下面这句话改写成自然、口语化的一到两句话，保留其中的用户和时长信息，不要加引号，也不要添加别的内容。每句话单独一行。",
            ),
            ChatMessage::user(format!("原句：{raw_reply}\n想表达的意思：{reason}")),
        ];

        let text = self.llm.ask(prompt).await?;
        let segments = split_reply(&text);
        if segments.is_empty() {
            bail!("改写结果为空");
        }
        Ok(segments)
    }
}

/// 按行拆分，丢掉空行
pub fn split_reply(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_blank_lines() {
        assert_eq!(
            split_reply("好的～\n\n  张三被禁言十分钟啦  \n"),
            vec!["好的～", "张三被禁言十分钟啦"]
        );
        assert!(split_reply(" \n\t").is_empty());
    }

    #[tokio::test]
    async fn verbatim_passes_through() {
        let out = Verbatim.rewrite("原话", "理由").await.unwrap();
        assert_eq!(out, vec!["原话"]);
    }
}

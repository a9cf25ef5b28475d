use crate::{
    config::{MuteConfig, TemplateSet},
    mute::{MuteKind, duration},
};
use rand::Rng;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("缺少键：{0}")]
    UnknownPlaceholder(String),
    #[error("花括号不成对")]
    Unbalanced,
}

/// `{name}` 按 `context` 替换，`{{`/`}}` 输出字面花括号，`{name:>5}` 这类格式说明被忽略。
pub fn substitute(template: &str, context: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(TemplateError::Unbalanced),
                        Some(ch) => field.push(ch),
                    }
                }
                let name = field.split([':', '!']).next().unwrap_or_default().trim();
                let value = context
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
                out.push_str(value);
            }
            '}' => return Err(TemplateError::Unbalanced),
            c => out.push(c),
        }
    }

    Ok(out)
}

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: TemplateSet,
    formatting: bool,
}

impl TemplateRenderer {
    pub fn new(config: &MuteConfig) -> Self {
        TemplateRenderer {
            templates: config.templates.clone(),
            formatting: config.enable_message_formatting,
        }
    }

    pub fn render(&self, kind: MuteKind, user_id: &str, duration: u32, reason: &str) -> String {
        self.render_with(&mut rand::rng(), kind, user_id, duration, reason)
    }

    /// 从对应模板池里随机挑一条。模板池为空时用固定句式，模板有误时退化成只含用户和原因的消息。
    pub fn render_with<R: Rng>(
        &self,
        rng: &mut R,
        kind: MuteKind,
        user_id: &str,
        duration: u32,
        reason: &str,
    ) -> String {
        let duration_text = if self.formatting {
            duration::display(duration)
        } else {
            format!("{duration}秒")
        };

        let pool = match kind {
            MuteKind::Mute => &self.templates.mute,
            MuteKind::Unmute => &self.templates.unmute,
        };

        if pool.is_empty() {
            warn!("未配置{}的消息模板，使用默认回复", kind.label());
            return format!(
                "操作已执行：对用户 {user_id} {}，时长：{duration_text}，原因：{reason}",
                kind.label()
            );
        }

        let template = &pool[rng.random_range(0..pool.len())];
        let context = [
            ("user_id", user_id),
            ("target", user_id),
            ("user_name", user_id),
            ("duration", duration_text.as_str()),
            ("reason", reason),
        ];

        match substitute(template, &context) {
            Ok(message) => message,
            Err(e) => {
                error!("格式化消息模板时出错，{e}。模板：'{template}'");
                format!("操作已执行，但消息模板格式化失败。用户：{user_id}，原因：{reason}")
            }
        }
    }
}

use crate::mute::duration::MAX_MUTE_SECONDS;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{level_filters::LevelFilter, warn};

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub napcat: ServerConfig,
    pub bot: BotConfig,
    pub components: ComponentsConfig,
    pub permissions: PermissionsConfig,
    pub mute: MuteConfig,
    pub smart_mute: SmartMuteConfig,
    pub mute_command: MuteCommandConfig,
    pub moderation: ModerationConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub access_token: Option<String>,
    pub reconnect_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            access_token: None,
            reconnect_interval_secs: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BotConfig {
    pub platform: String,
    pub command_prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            platform: "qq".to_string(),
            command_prefix: "/".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ComponentsConfig {
    pub enable_smart_mute: bool,
    /// 调试用，默认关闭
    pub enable_mute_command: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        ComponentsConfig {
            enable_smart_mute: true,
            enable_mute_command: false,
        }
    }
}

/// 权限列表，元素格式为 `platform:id`，如 `qq:123456789`。空列表表示不做限制。
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct PermissionsConfig {
    /// 允许使用禁言命令的用户
    pub allowed_users: Vec<String>,
    /// 允许使用禁言动作的群
    pub allowed_groups: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MuteConfig {
    /// 关闭后时长一律按秒显示
    pub enable_message_formatting: bool,
    pub templates: TemplateSet,
}

impl Default for MuteConfig {
    fn default() -> Self {
        MuteConfig {
            enable_message_formatting: true,
            templates: TemplateSet::default(),
        }
    }
}

/// 禁言/解除禁言成功后随机选用的消息模板。
///
/// 可用占位符：`{target}` `{user_id}` `{user_name}`（三者等价）、`{duration}`、`{reason}`。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TemplateSet {
    pub mute: Vec<String>,
    pub unmute: Vec<String>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        TemplateSet {
            mute: vec![
                "{target}，你因为{reason}被关进小黑屋{duration}，好好反省一下吧！".to_string(),
                "哟，这不是{target}嘛，{reason}的样子真狼狈，禁言套餐{duration}送上！".to_string(),
                "根据群规，决定对{user_name}处以禁言{duration}的惩罚，原因：{reason}".to_string(),
                "已将 {target} 禁言 {duration}，理由：{reason}".to_string(),
            ],
            unmute: vec![
                "好的，已解除用户 {user_id} 的禁言。".to_string(),
                "收到，已为用户 {user_id} 解除禁言。".to_string(),
                "明白了，用户 {user_id} 的禁言已解除。".to_string(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeywordSensitivity {
    /// 需要 @机器人 且命中关键词
    Low,
    /// 命中关键词即可
    Normal,
    /// 命中关键词或 @机器人
    High,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SmartMuteConfig {
    pub strict_mode: bool,
    pub keyword_sensitivity: KeywordSensitivity,
    pub activation_keywords: Vec<String>,
    pub default_duration: u32,
    /// 交给 LLM 判定时附带的最近消息条数
    pub context_messages: usize,
    /// 是否让 LLM 把回复改写成更自然的说法
    pub rewrite_replies: bool,
}

impl Default for SmartMuteConfig {
    fn default() -> Self {
        SmartMuteConfig {
            strict_mode: true,
            keyword_sensitivity: KeywordSensitivity::Normal,
            activation_keywords: vec![
                "禁言".to_string(),
                "mute".to_string(),
                "解禁".to_string(),
                "unmute".to_string(),
            ],
            default_duration: 3600,
            context_messages: 15,
            rewrite_replies: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MuteCommandConfig {
    pub default_duration: u32,
    /// 保留字段，目前不做限流
    pub cooldown_seconds: u64,
}

impl Default for MuteCommandConfig {
    fn default() -> Self {
        MuteCommandConfig {
            default_duration: 600,
            cooldown_seconds: 3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ModerationConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        ModerationConfig {
            endpoint: "http://127.0.0.1:3000/set_group_ban".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// 不填则使用 genai 对应厂商的默认地址
    pub base_url: Option<String>,
    /// 存放 API Key 的环境变量名
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub prefix: String,
    pub include_user_info: bool,
    pub include_action_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            prefix: "[MuteUserPlugin]".to_string(),
            include_user_info: true,
            include_action_info: true,
        }
    }
}

impl Config {
    /// 默认禁言时长必须在 `[1, 2592000]` 内，否则换回内置默认值。
    /// 0 会让不带时长的禁言变成解禁。
    pub fn sanitize(&mut self) {
        let action = &mut self.smart_mute.default_duration;
        if *action == 0 || *action > MAX_MUTE_SECONDS {
            let fallback = SmartMuteConfig::default().default_duration;
            warn!("smart_mute.default_duration = {} 超出范围，改用 {}", action, fallback);
            *action = fallback;
        }

        let command = &mut self.mute_command.default_duration;
        if *command == 0 || *command > MAX_MUTE_SECONDS {
            let fallback = MuteCommandConfig::default().default_duration;
            warn!("mute_command.default_duration = {} 超出范围，改用 {}", command, fallback);
            *command = fallback;
        }
    }
}

pub async fn load_config(path: &str) -> Result<Config> {
    let config_contents = tokio::fs::read_to_string(path).await?;
    let config: Config = toml::from_str(&config_contents)?;
    Ok(config)
}

pub async fn save_config(path: &str, config: &Config) -> Result<()> {
    let config_contents = toml::to_string_pretty(config)?;
    tokio::fs::write(path, config_contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [permissions]
            allowed_users = ["qq:10001"]

            [mute.templates]
            mute = ["{target} 禁言 {duration}"]

            [logging]
            level = "WARNING"
            "#,
        )
        .unwrap();

        assert_eq!(config.permissions.allowed_users, vec!["qq:10001"]);
        assert!(config.permissions.allowed_groups.is_empty());
        assert_eq!(config.mute.templates.mute.len(), 1);
        // 只写了 mute 池时 unmute 池沿用默认模板
        assert_eq!(
            config.mute.templates.unmute,
            TemplateSet::default().unmute
        );
        assert!(config.mute.enable_message_formatting);
        assert_eq!(config.mute_command.default_duration, 600);
        assert_eq!(config.smart_mute.default_duration, 3600);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(LevelFilter::from(config.logging.level), LevelFilter::WARN);
        assert_eq!(
            config.moderation.endpoint,
            "http://127.0.0.1:3000/set_group_ban"
        );
    }

    #[test]
    fn zero_default_duration_is_replaced() {
        let mut config: Config = toml::from_str(
            r#"
            [smart_mute]
            default_duration = 0

            [mute_command]
            default_duration = 99999999
            "#,
        )
        .unwrap();
        config.sanitize();
        assert_eq!(config.smart_mute.default_duration, 3600);
        assert_eq!(config.mute_command.default_duration, 600);

        let mut config = Config::default();
        config.mute_command.default_duration = 60;
        config.sanitize();
        assert_eq!(config.mute_command.default_duration, 60);
    }

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[mute.templates]"));
        assert!(text.contains("keyword_sensitivity = \"normal\""));
    }
}

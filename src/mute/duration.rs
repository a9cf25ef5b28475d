use std::fmt;

/// 单次禁言的最长时长：30 天。
pub const MAX_MUTE_SECONDS: u32 = 2_592_000;

/// 从 LLM 输出或命令参数中拿到的原始时长，类型不确定。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawDuration {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
}

impl From<Option<String>> for RawDuration {
    fn from(value: Option<String>) -> Self {
        value.map_or(RawDuration::Missing, RawDuration::Text)
    }
}

impl From<i64> for RawDuration {
    fn from(value: i64) -> Self {
        RawDuration::Integer(value)
    }
}

impl fmt::Display for RawDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawDuration::Missing => f.write_str("<缺省>"),
            RawDuration::Text(s) => write!(f, "{s:?}"),
            RawDuration::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// 结果总在 `[0, MAX_MUTE_SECONDS]` 内，0 表示解除禁言。
///
/// 无法转成整数、小于 0 或超过上限时使用 `default`。`default` 本身被限制在
/// `[1, MAX_MUTE_SECONDS]`，回落的结果总是禁言，不会变成解禁。
pub fn normalize(raw: &RawDuration, default: u32) -> u32 {
    let parsed = match raw {
        RawDuration::Missing => None,
        RawDuration::Text(s) => s.trim().parse::<i64>().ok(),
        RawDuration::Integer(n) => Some(*n),
    };

    match parsed {
        Some(0) => 0,
        Some(n) if (1..=i64::from(MAX_MUTE_SECONDS)).contains(&n) => n as u32,
        _ => default.clamp(1, MAX_MUTE_SECONDS),
    }
}

/// 按量级换算成秒/分钟/小时/天，向下取整。
pub fn display(seconds: u32) -> String {
    match seconds {
        s if s < 60 => format!("{s}秒"),
        s if s < 3600 => format!("{}分钟", s / 60),
        s if s < 86400 => format!("{}小时", s / 3600),
        s => format!("{}天", s / 86400),
    }
}

use serde::{Deserialize, Deserializer};
use std::ops::Deref;

/// 模型给的布尔值五花八门，这里尽量都认。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmBool(pub bool);

impl Deref for LlmBool {
    type Target = bool;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<LlmBool> for bool {
    fn from(lb: LlmBool) -> Self {
        lb.0
    }
}

impl<'de> Deserialize<'de> for LlmBool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "t" | "on" | "真" | "是" => Ok(LlmBool(true)),
            "false" | "0" | "no" | "n" | "f" | "off" | "假" | "否" | "null" | "none" | "" => {
                Ok(LlmBool(false))
            }
            _ => Err(serde::de::Error::custom(format!(
                "无法将字符串 '{}' 解析为布尔值",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_xml;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Wrapper {
        flag: LlmBool,
    }

    #[test]
    fn loose_spellings() {
        for (raw, expected) in [("true", true), (" YES ", true), ("是", true), ("0", false), ("否", false)] {
            let xml = format!("<w><flag>{raw}</flag></w>");
            let w: Wrapper = parse_xml(&xml).unwrap();
            assert_eq!(*w.flag, expected, "{raw}");
        }
        assert!(parse_xml::<Wrapper>("<w><flag>也许</flag></w>").is_err());
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Telegram user id (numeric).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// The sender of an incoming event, as seen by the core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CheckGrammar,
    ImproveText,
    ShortenText,
    Translate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::CheckGrammar,
        OperationKind::ImproveText,
        OperationKind::ShortenText,
        OperationKind::Translate,
    ];

    /// Stable identifier used in storage and button payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::CheckGrammar => "check_grammar",
            OperationKind::ImproveText => "improve_text",
            OperationKind::ShortenText => "shorten_text",
            OperationKind::Translate => "translate",
        }
    }

    /// Resolve a chat command name (without the leading `/`).
    pub fn from_command(cmd: &str) -> Option<Self> {
        match cmd {
            "check" | "grammar" => Some(OperationKind::CheckGrammar),
            "improve" => Some(OperationKind::ImproveText),
            "shorten" | "short" => Some(OperationKind::ShortenText),
            "translate" => Some(OperationKind::Translate),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        OperationKind::ALL
            .into_iter()
            .find(|op| op.as_str() == lower)
            .or_else(|| OperationKind::from_command(&lower))
            .ok_or(ValidationError::UnknownOperation(s.to_string()))
    }
}

/// Supported translation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    En,
    Uz,
    Am,
    Ru,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 4] = [
        TargetLanguage::En,
        TargetLanguage::Uz,
        TargetLanguage::Am,
        TargetLanguage::Ru,
    ];

    pub fn code(self) -> &'static str {
        match self {
            TargetLanguage::En => "en",
            TargetLanguage::Uz => "uz",
            TargetLanguage::Am => "am",
            TargetLanguage::Ru => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.trim().to_lowercase();
        TargetLanguage::ALL
            .into_iter()
            .find(|lang| lang.code() == lower)
    }

    /// Russian name in the form used inside prompts ("на английский").
    pub fn prompt_name(self) -> &'static str {
        match self {
            TargetLanguage::En => "английский",
            TargetLanguage::Uz => "узбекский",
            TargetLanguage::Am => "армянский",
            TargetLanguage::Ru => "русский",
        }
    }

    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            TargetLanguage::En => "🇬🇧 Английский",
            TargetLanguage::Uz => "🇺🇿 Узбекский",
            TargetLanguage::Am => "🇦🇲 Армянский",
            TargetLanguage::Ru => "🇷🇺 Русский",
        }
    }
}

/// Per-request options passed through to the gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub no_dot: bool,
    pub target_language: Option<TargetLanguage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_parses_ids_and_command_aliases() {
        assert_eq!(
            "check_grammar".parse::<OperationKind>(),
            Ok(OperationKind::CheckGrammar)
        );
        assert_eq!("Short".parse::<OperationKind>(), Ok(OperationKind::ShortenText));
        assert_eq!(
            "summarize".parse::<OperationKind>(),
            Err(ValidationError::UnknownOperation("summarize".to_string()))
        );
    }

    #[test]
    fn language_codes_are_case_insensitive() {
        assert_eq!(TargetLanguage::from_code("EN"), Some(TargetLanguage::En));
        assert_eq!(TargetLanguage::from_code(" am "), Some(TargetLanguage::Am));
        assert_eq!(TargetLanguage::from_code("de"), None);
    }

    #[test]
    fn operation_serializes_as_snake_case() {
        let v = serde_json::to_value(OperationKind::ImproveText).unwrap();
        assert_eq!(v, serde_json::json!("improve_text"));
    }
}

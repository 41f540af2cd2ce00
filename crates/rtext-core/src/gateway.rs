//! Text processing gateway port.
//!
//! The language model lives behind [`TextGateway`]; the YandexGPT adapter is in
//! `rtext-yandex`. Prompts and output post-processing are shared here so every
//! provider behaves the same.

use async_trait::async_trait;

use crate::{
    domain::{OperationKind, ProcessOptions},
    text::{normalize_dashes, strip_paragraph_dots},
};

/// Externally observable gateway failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    pub fn upstream(status: u16, body: &str) -> Self {
        GatewayError::Upstream {
            status,
            body: body.chars().take(200).collect(),
        }
    }
}

#[async_trait]
pub trait TextGateway: Send + Sync {
    async fn process(
        &self,
        text: &str,
        operation: OperationKind,
        options: ProcessOptions,
    ) -> std::result::Result<String, GatewayError>;
}

const GRAMMAR_PROMPT: &str = "Ты корректор русского языка. Исправь орфографические, \
пунктуационные и грамматические ошибки в тексте, сохраняя авторский стиль, порядок слов \
и смысл. Верни только исправленный текст без пояснений.";

const IMPROVE_PROMPT: &str = "Ты редактор русского языка. Исправь ошибки и улучши стиль \
текста: сделай его более читаемым, ясным и естественным, сохранив смысл и тон. \
Верни только улучшенный текст без пояснений.";

const SHORTEN_PROMPT: &str = "Ты редактор русского языка. Сократи текст: убери лишние \
слова и повторы, сохранив основную мысль и грамотность. Верни только сокращённый \
текст без пояснений.";

const NO_DOT_HINT: &str = "Не ставь точку в конце абзацев.";

/// System prompt for an operation.
///
/// Translation without a target language falls back to English; the assistant
/// validates the language before calling the gateway.
pub fn system_prompt(operation: OperationKind, options: ProcessOptions) -> String {
    let base = match operation {
        OperationKind::CheckGrammar => GRAMMAR_PROMPT.to_string(),
        OperationKind::ImproveText => IMPROVE_PROMPT.to_string(),
        OperationKind::ShortenText => SHORTEN_PROMPT.to_string(),
        OperationKind::Translate => {
            let lang = options
                .target_language
                .map(|l| l.prompt_name())
                .unwrap_or("английский");
            format!(
                "Ты профессиональный переводчик. Переведи текст на {lang} язык, \
сохраняя смысл, стиль и форматирование. Верни только перевод без пояснений."
            )
        }
    };

    if options.no_dot {
        format!("{base} {NO_DOT_HINT}")
    } else {
        base
    }
}

pub fn user_prompt(text: &str) -> String {
    format!("Обработай следующий текст:\n\n{text}")
}

/// Fixed post-processing applied to every successful gateway result.
pub fn finish_output(raw: &str, options: ProcessOptions) -> String {
    let text = normalize_dashes(raw.trim());
    if options.no_dot {
        strip_paragraph_dots(&text)
    } else {
        text
    }
}

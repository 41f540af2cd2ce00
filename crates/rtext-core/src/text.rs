//! Input validation, modifier parsing and output post-processing.

use std::sync::OnceLock;

use regex::Regex;

use crate::{domain::TargetLanguage, errors::ValidationError};

pub const NO_DOT_TOKEN: &str = "nodot";

/// Command arguments after modifiers were stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedArgs {
    pub text: String,
    pub no_dot: bool,
}

/// Trim and bound-check request text. Length is counted in characters.
pub fn validate_text(text: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(ValidationError::TooLong { len, max: max_len });
    }
    Ok(trimmed.to_string())
}

fn no_dot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bnodot\b").expect("valid regex"))
}

fn space_before_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([.,!?;:])").expect("valid regex"))
}

/// Strip the `nodot` token (case-insensitive, whole word, anywhere).
///
/// Punctuation may touch the token ("дела,nodot", "nodot."). Line breaks
/// survive; whitespace inside a line that contained the token is collapsed to
/// single spaces.
pub fn parse_modifiers(args: &str) -> ParsedArgs {
    let re = no_dot_re();
    if !re.is_match(args) {
        return ParsedArgs {
            text: args.trim().to_string(),
            no_dot: false,
        };
    }

    let lines = args
        .lines()
        .map(|line| {
            if !re.is_match(line) {
                return line.to_string();
            }
            let stripped = re.replace_all(line, " ");
            let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
            space_before_punct_re()
                .replace_all(&collapsed, "$1")
                .into_owned()
        })
        .collect::<Vec<_>>();

    ParsedArgs {
        text: lines.join("\n").trim().to_string(),
        no_dot: true,
    }
}

/// Split an optional leading language code off `/translate` arguments.
pub fn parse_translate_args(args: &str) -> (Option<TargetLanguage>, String) {
    let trimmed = args.trim_start();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    match TargetLanguage::from_code(first) {
        Some(lang) => (Some(lang), parts.next().unwrap_or("").trim().to_string()),
        None => (None, args.trim().to_string()),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Em dash becomes en dash; a hyphen not touching a word character on either
/// side becomes en dash too. Hyphens inside words ("кто-то") are kept.
pub fn normalize_dashes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '—' => out.push('–'),
            '-' => {
                let prev_word = i > 0 && is_word_char(chars[i - 1]);
                let next_word = chars.get(i + 1).copied().is_some_and(is_word_char);
                if prev_word || next_word {
                    out.push('-');
                } else {
                    out.push('–');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Remove a single trailing period at the end of each paragraph (line).
/// Ellipses are left alone.
pub fn strip_paragraph_dots(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let body = line.trim_end();
            if body.ends_with('.') && !body.ends_with("..") {
                let rest = &line[body.len()..];
                format!("{}{}", &body[..body.len() - 1], rest)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

use crate::domain::{OperationKind, TargetLanguage};

/// Outgoing "chat action" (typing indicator, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// Inline keyboard (buttons), one `Vec` per row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Button payloads understood by the assistant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonChoice {
    Operation(OperationKind),
    Language(TargetLanguage),
    Help,
}

impl ButtonChoice {
    pub fn parse(data: &str) -> Option<Self> {
        if data == "help" {
            return Some(ButtonChoice::Help);
        }
        if let Some(op) = data.strip_prefix("op:") {
            return op.parse().ok().map(ButtonChoice::Operation);
        }
        if let Some(code) = data.strip_prefix("lang:") {
            return TargetLanguage::from_code(code).map(ButtonChoice::Language);
        }
        None
    }

    pub fn callback_data(self) -> String {
        match self {
            ButtonChoice::Operation(op) => format!("op:{}", op.as_str()),
            ButtonChoice::Language(lang) => format!("lang:{}", lang.code()),
            ButtonChoice::Help => "help".to_string(),
        }
    }
}

impl InlineKeyboard {
    /// Convenience for "one button per row" layouts.
    pub fn one_per_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Main action menu.
    pub fn actions(include_help: bool) -> Self {
        let mut buttons = vec![
            InlineButton::new(
                "📝 Проверить грамотность",
                ButtonChoice::Operation(OperationKind::CheckGrammar).callback_data(),
            ),
            InlineButton::new(
                "✨ Улучшить текст",
                ButtonChoice::Operation(OperationKind::ImproveText).callback_data(),
            ),
            InlineButton::new(
                "📄 Сократить текст",
                ButtonChoice::Operation(OperationKind::ShortenText).callback_data(),
            ),
            InlineButton::new(
                "🌐 Перевести",
                ButtonChoice::Operation(OperationKind::Translate).callback_data(),
            ),
        ];
        if include_help {
            buttons.push(InlineButton::new(
                "ℹ️ Помощь",
                ButtonChoice::Help.callback_data(),
            ));
        }
        Self::one_per_row(buttons)
    }

    /// Translation target menu, two languages per row.
    pub fn languages() -> Self {
        let buttons: Vec<InlineButton> = TargetLanguage::ALL
            .into_iter()
            .map(|lang| {
                InlineButton::new(lang.label(), ButtonChoice::Language(lang).callback_data())
            })
            .collect();
        Self {
            rows: buttons.chunks(2).map(|c| c.to_vec()).collect(),
        }
    }
}

/// What the assistant wants sent back for one incoming event.
///
/// `parts` are Telegram HTML, delivered in order; `menu` goes with the last part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub parts: Vec<String>,
    pub menu: Option<InlineKeyboard>,
}

impl Reply {
    pub fn text(html: impl Into<String>) -> Self {
        Self {
            parts: vec![html.into()],
            menu: None,
        }
    }

    pub fn parts(parts: Vec<String>) -> Self {
        Self { parts, menu: None }
    }

    pub fn with_menu(mut self, menu: InlineKeyboard) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.menu.is_none()
    }
}

/// Feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_inline_keyboards: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_payloads_parse_back() {
        for op in OperationKind::ALL {
            let data = ButtonChoice::Operation(op).callback_data();
            assert_eq!(ButtonChoice::parse(&data), Some(ButtonChoice::Operation(op)));
        }
        assert_eq!(
            ButtonChoice::parse("lang:am"),
            Some(ButtonChoice::Language(TargetLanguage::Am))
        );
        assert_eq!(ButtonChoice::parse("help"), Some(ButtonChoice::Help));
        assert_eq!(ButtonChoice::parse("op:dance"), None);
        assert_eq!(ButtonChoice::parse("lang:fr"), None);
        assert_eq!(ButtonChoice::parse("op:"), None);
        assert_eq!(ButtonChoice::parse("op:translate:en"), None);
    }

    #[test]
    fn language_menu_has_two_per_row() {
        let kb = InlineKeyboard::languages();
        assert_eq!(kb.rows.len(), 2);
        assert!(kb.rows.iter().all(|r| r.len() == 2));
        assert_eq!(kb.rows[0][0].callback_data, "lang:en");
    }

    #[test]
    fn action_menu_optionally_has_help() {
        assert_eq!(InlineKeyboard::actions(true).rows.len(), 5);
        assert_eq!(InlineKeyboard::actions(false).rows.len(), 4);
    }
}

//! Request flow: commands, pending input, buttons, execution.
//!
//! The assistant turns one incoming event into one [`Reply`]. It never talks to
//! Telegram directly; the transport delivers the reply via
//! [`deliver`](crate::messaging::delivery::deliver).
//!
//! Every command clears the caller's pending state before doing anything else,
//! and execution takes the state before the gateway call, so a failed call
//! leaves the user idle.

use std::sync::Arc;

use crate::{
    config::Config,
    domain::{OperationKind, ProcessOptions, TargetLanguage, UserId, UserRef},
    errors::ValidationError,
    gateway::TextGateway,
    ledger::Ledger,
    messaging::types::{ButtonChoice, Reply},
    pending::{PendingState, PendingStates},
    replies,
    text::{parse_modifiers, parse_translate_args, validate_text},
};

pub struct Assistant {
    cfg: Arc<Config>,
    ledger: Arc<Ledger>,
    pending: Arc<PendingStates>,
    gateway: Arc<dyn TextGateway>,
}

impl Assistant {
    pub fn new(
        cfg: Arc<Config>,
        ledger: Arc<Ledger>,
        pending: Arc<PendingStates>,
        gateway: Arc<dyn TextGateway>,
    ) -> Self {
        Self {
            cfg,
            ledger,
            pending,
            gateway,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn pending(&self) -> &PendingStates {
        &self.pending
    }

    pub async fn on_start(&self, user: &UserRef) -> Reply {
        self.on_command(user, "start", "").await
    }

    /// `command` is lowercase without the leading slash or `@bot` suffix.
    pub async fn on_command(&self, user: &UserRef, command: &str, raw_args: &str) -> Reply {
        self.touch(user).await;
        let previous = self.pending.take_pending(user.id).await;
        tracing::debug!(user_id = %user.id, command, "command");

        match command {
            "start" => replies::welcome(),
            "help" => replies::help(self.cfg.max_text_length),
            "cancel" => replies::cancelled(!previous.is_none()),
            "stats" => self.user_stats(user.id).await,
            "admin" => self.admin_stats(user.id).await,
            other => match OperationKind::from_command(other) {
                Some(op) => self.start_operation(user.id, op, raw_args).await,
                None => replies::unknown_command(other),
            },
        }
    }

    /// Plain text that is neither a command nor a forward.
    pub async fn on_free_text(&self, user: &UserRef, text: &str) -> Reply {
        self.touch(user).await;

        match self.pending.take_pending(user.id).await {
            PendingState::AwaitingText {
                operation: OperationKind::Translate,
                options,
            } if options.target_language.is_none() => {
                self.pending
                    .set_pending_forward(user.id, Some(OperationKind::Translate), text, options)
                    .await;
                replies::choose_language()
            }
            PendingState::AwaitingText { operation, options } => {
                self.execute(user.id, operation, text, options).await
            }
            PendingState::AwaitingForwardedText { .. } | PendingState::None => {
                replies::choose_action()
            }
        }
    }

    /// A forwarded message: keep its text and ask what to do with it.
    pub async fn on_forwarded_text(&self, user: &UserRef, text: &str) -> Reply {
        self.touch(user).await;
        self.pending.take_pending(user.id).await;

        if text.trim().is_empty() {
            return replies::validation(&ValidationError::Empty);
        }
        self.pending
            .set_pending_forward(user.id, None, text, ProcessOptions::default())
            .await;
        replies::choose_forward_action()
    }

    /// Inline button press, `choice_id` is the raw callback data.
    pub async fn on_button_choice(&self, user: &UserRef, choice_id: &str) -> Reply {
        self.touch(user).await;

        let Some(choice) = ButtonChoice::parse(choice_id) else {
            if let Some(op) = choice_id.strip_prefix("op:") {
                return replies::validation(&ValidationError::UnknownOperation(op.to_string()));
            }
            tracing::debug!(user_id = %user.id, choice_id, "unknown button");
            return replies::unknown_button();
        };

        match choice {
            ButtonChoice::Help => replies::help(self.cfg.max_text_length),
            ButtonChoice::Operation(op) => self.choose_operation(user.id, op).await,
            ButtonChoice::Language(lang) => self.choose_language(user.id, lang).await,
        }
    }

    async fn touch(&self, user: &UserRef) {
        self.ledger
            .get_or_create(
                user.id,
                user.username.as_deref(),
                user.display_name.as_deref(),
            )
            .await;
    }

    async fn start_operation(&self, user_id: UserId, op: OperationKind, raw_args: &str) -> Reply {
        let parsed = parse_modifiers(raw_args);
        let (target_language, text) = if op == OperationKind::Translate {
            parse_translate_args(&parsed.text)
        } else {
            (None, parsed.text)
        };
        let options = ProcessOptions {
            no_dot: parsed.no_dot,
            target_language,
        };

        let needs_language = op == OperationKind::Translate && target_language.is_none();
        match (text.is_empty(), needs_language) {
            (true, true) => {
                self.pending.set_pending_with(user_id, op, options).await;
                replies::choose_language()
            }
            (true, false) => {
                self.pending.set_pending_with(user_id, op, options).await;
                replies::prompt_for(op, options)
            }
            (false, true) => {
                self.pending
                    .set_pending_forward(user_id, Some(op), text, options)
                    .await;
                replies::choose_language()
            }
            (false, false) => self.execute(user_id, op, &text, options).await,
        }
    }

    async fn choose_operation(&self, user_id: UserId, op: OperationKind) -> Reply {
        match self.pending.take_pending(user_id).await {
            PendingState::AwaitingForwardedText { text, options, .. } => {
                if op == OperationKind::Translate && options.target_language.is_none() {
                    self.pending
                        .set_pending_forward(user_id, Some(op), text, options)
                        .await;
                    return replies::choose_language();
                }
                self.execute(user_id, op, &text, options).await
            }
            previous => {
                let no_dot = match previous {
                    PendingState::AwaitingText { options, .. } => options.no_dot,
                    _ => false,
                };
                let options = ProcessOptions {
                    no_dot,
                    target_language: None,
                };
                self.pending.set_pending_with(user_id, op, options).await;
                if op == OperationKind::Translate {
                    replies::choose_language()
                } else {
                    replies::prompt_for(op, options)
                }
            }
        }
    }

    async fn choose_language(&self, user_id: UserId, lang: TargetLanguage) -> Reply {
        match self.pending.take_pending(user_id).await {
            PendingState::AwaitingForwardedText { text, options, .. } => {
                let options = ProcessOptions {
                    target_language: Some(lang),
                    ..options
                };
                self.execute(user_id, OperationKind::Translate, &text, options)
                    .await
            }
            previous => {
                let no_dot = match previous {
                    PendingState::AwaitingText {
                        operation: OperationKind::Translate,
                        options,
                    } => options.no_dot,
                    _ => false,
                };
                let options = ProcessOptions {
                    no_dot,
                    target_language: Some(lang),
                };
                self.pending
                    .set_pending_with(user_id, OperationKind::Translate, options)
                    .await;
                replies::prompt_for(OperationKind::Translate, options)
            }
        }
    }

    async fn execute(
        &self,
        user_id: UserId,
        op: OperationKind,
        text: &str,
        options: ProcessOptions,
    ) -> Reply {
        let text = match validate_text(text, self.cfg.max_text_length) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(user_id = %user_id, operation = %op, "rejected: {e}");
                return replies::validation(&e);
            }
        };
        if op == OperationKind::Translate && options.target_language.is_none() {
            return replies::validation(&ValidationError::MissingTargetLanguage);
        }

        // Counted before the call: failed requests still show up in the stats.
        self.ledger.record_request(user_id, op).await;

        let started = std::time::Instant::now();
        match self.gateway.process(&text, op, options).await {
            Ok(output) => {
                tracing::info!(
                    user_id = %user_id,
                    operation = %op,
                    input_chars = text.chars().count(),
                    output_chars = output.chars().count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "operation completed"
                );
                replies::result(op, options, &output, self.cfg.telegram_safe_limit)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    operation = %op,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "gateway call failed: {e}"
                );
                replies::gateway_failure(&e)
            }
        }
    }

    async fn user_stats(&self, user_id: UserId) -> Reply {
        match self.ledger.get_user_stats(user_id).await {
            Some(profile) => replies::user_stats(&profile),
            None => replies::stats_unavailable(),
        }
    }

    async fn admin_stats(&self, user_id: UserId) -> Reply {
        if !self.ledger.is_admin(user_id) {
            tracing::info!(user_id = %user_id, "admin command refused");
            return replies::admin_only();
        }
        replies::admin_stats(&self.ledger.get_stats().await)
    }
}

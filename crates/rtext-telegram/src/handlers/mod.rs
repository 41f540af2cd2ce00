//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - turns the teloxide update into a core event (`UserRef` + text),
//! - calls the core `Assistant`,
//! - delivers the returned `Reply` through the messaging port.
//!
//! Updates from one user are handled one at a time (see `UserLocks`).

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, MessageKind, User},
};

use rtext_core::{
    domain::{ChatId, UserId, UserRef},
    messaging::{delivery::deliver, types::Reply},
    replies,
};

use crate::router::AppState;

mod callback;
mod commands;
mod text;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = user_ref(from);
    let chat_id = ChatId(msg.chat.id.0);

    // Sequentialize updates per user.
    let _guard = state.user_locks.lock_user(user.id.0).await;

    if msg.forward().is_some() {
        if let Some(text) = msg.text().or_else(|| msg.caption()) {
            return text::handle_forwarded(&state, chat_id, &user, text).await;
        }
    }

    if let Some(body) = msg.text() {
        if body.starts_with('/') {
            return commands::handle_command(&state, chat_id, &user, body).await;
        }
        return text::handle_text(&state, chat_id, &user, body).await;
    }

    if wants_text_hint(&msg) {
        respond(&state, chat_id, replies::text_only()).await;
    } else {
        tracing::debug!(user_id = %user.id, "ignoring non-text message");
    }
    Ok(())
}

/// Media from a person in a private chat; service messages and groups stay silent.
fn wants_text_hint(msg: &Message) -> bool {
    msg.chat.is_private() && matches!(msg.kind, MessageKind::Common(_))
}

pub(crate) fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        display_name: Some(user.full_name()).filter(|n| !n.trim().is_empty()),
    }
}

/// Deliver `reply`; on failure log it and try a short apology.
pub(crate) async fn respond(state: &AppState, chat_id: ChatId, reply: Reply) {
    if reply.is_empty() {
        return;
    }
    if let Err(e) = deliver(state.messenger.as_ref(), chat_id, reply).await {
        tracing::warn!(chat_id = chat_id.0, "failed to deliver reply: {e}");
        if let Err(e) = state
            .messenger
            .send_html(chat_id, replies::DELIVERY_FAILED)
            .await
        {
            tracing::error!(chat_id = chat_id.0, "failed to deliver apology: {e}");
        }
    }
}

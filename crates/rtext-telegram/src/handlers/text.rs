use rtext_core::{
    domain::{ChatId, UserRef},
    messaging::types::ChatAction,
};
use teloxide::prelude::*;

use crate::router::AppState;

use super::respond;

pub async fn handle_text(
    state: &AppState,
    chat_id: ChatId,
    user: &UserRef,
    text: &str,
) -> ResponseResult<()> {
    // Only pending input turns into a gateway call.
    if state.assistant.pending().has_pending(user.id).await {
        let _ = state
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await;
    }

    let reply = state.assistant.on_free_text(user, text).await;
    respond(state, chat_id, reply).await;
    Ok(())
}

pub async fn handle_forwarded(
    state: &AppState,
    chat_id: ChatId,
    user: &UserRef,
    text: &str,
) -> ResponseResult<()> {
    tracing::debug!(user_id = %user.id, chars = text.chars().count(), "forwarded text");
    let reply = state.assistant.on_forwarded_text(user, text).await;
    respond(state, chat_id, reply).await;
    Ok(())
}

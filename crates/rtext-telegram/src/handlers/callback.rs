use std::sync::Arc;

use rtext_core::{domain::ChatId, messaging::types::ChatAction};
use teloxide::{prelude::*, types::CallbackQuery};

use crate::router::AppState;

use super::{respond, user_ref};

fn executes_on_press(data: &str) -> bool {
    data.starts_with("op:") || data.starts_with("lang:")
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let chat_id = q.message.as_ref().map(|m| ChatId(m.chat.id.0));
    let data = q.data.clone().unwrap_or_default();

    // Always answer callback query, so the button stops spinning.
    if let Err(e) = state.messenger.answer_callback_query(&cb_id, None).await {
        tracing::debug!("answer_callback_query failed: {e}");
    }

    let Some(chat_id) = chat_id else {
        return Ok(());
    };
    if data.is_empty() {
        return Ok(());
    }

    let user = user_ref(&q.from);
    let _guard = state.user_locks.lock_user(user.id.0).await;
    tracing::info!(user_id = %user.id, data = %data, "button pressed");

    if executes_on_press(&data) {
        let _ = state
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await;
    }

    let reply = state.assistant.on_button_choice(&user, &data).await;
    respond(&state, chat_id, reply).await;
    Ok(())
}

use rtext_core::{
    domain::{ChatId, UserRef},
    messaging::types::ChatAction,
};
use teloxide::prelude::*;

use crate::router::AppState;

use super::respond;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(
    state: &AppState,
    chat_id: ChatId,
    user: &UserRef,
    text: &str,
) -> ResponseResult<()> {
    let (cmd, args) = parse_command(text);
    tracing::info!(user_id = %user.id, command = %cmd, has_args = !args.is_empty(), "command received");

    if !args.is_empty() {
        let _ = state
            .messenger
            .send_chat_action(chat_id, ChatAction::Typing)
            .await;
    }

    let reply = state.assistant.on_command(user, &cmd, &args).await;
    respond(state, chat_id, reply).await;
    Ok(())
}

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::Reply},
    Result,
};

/// Send a [`Reply`] part by part. The menu, if any, rides on the last part.
///
/// Stops at the first failed send and returns its error.
pub async fn deliver(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    reply: Reply,
) -> Result<Vec<MessageRef>> {
    let Reply { parts, menu } = reply;
    let mut sent = Vec::with_capacity(parts.len());
    let last = parts.len().saturating_sub(1);

    for (i, part) in parts.iter().enumerate() {
        let msg = match (&menu, i == last) {
            (Some(kb), true) if messenger.capabilities().supports_inline_keyboards => {
                messenger
                    .send_inline_keyboard(chat_id, part, kb.clone())
                    .await?
            }
            _ => messenger.send_html(chat_id, part).await?,
        };
        sent.push(msg);
    }

    Ok(sent)
}

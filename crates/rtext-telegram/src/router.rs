use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use rtext_core::{assistant::Assistant, config::Config, messaging::port::MessagingPort};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub messenger: Arc<dyn MessagingPort>,
    pub user_locks: Arc<UserLocks>,
}

/// One async lock per user id. Entries are never removed.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, assistant: Arc<Assistant>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = %me.username(), "rtext started"),
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    tracing::info!(
        max_text_length = cfg.max_text_length,
        admins = cfg.admin_ids.len(),
        users_file = %cfg.users_file.display(),
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        assistant,
        messenger,
        user_locks: Arc::new(UserLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "an error from the update handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}

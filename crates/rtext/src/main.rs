use std::sync::Arc;

use rtext_core::{
    assistant::Assistant, config::Config, ledger::Ledger, pending::PendingStates,
};
use rtext_yandex::YandexGptClient;

#[tokio::main]
async fn main() -> Result<(), rtext_core::Error> {
    rtext_core::logging::init("rtext")?;

    let cfg = Arc::new(Config::load()?);

    let ledger = Arc::new(
        Ledger::open(cfg.users_file.clone(), &cfg.admin_ids)
            .with_name_refresh(cfg.refresh_profile_names),
    );
    let gateway = Arc::new(YandexGptClient::from_config(&cfg)?);
    tracing::info!(model = %cfg.yandex_model, "yandexgpt gateway ready");

    let assistant = Arc::new(Assistant::new(
        cfg.clone(),
        ledger,
        Arc::new(PendingStates::new()),
        gateway,
    ));

    rtext_telegram::router::run_polling(cfg, assistant)
        .await
        .map_err(|e| rtext_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}

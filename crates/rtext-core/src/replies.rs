//! User-facing texts (Telegram HTML, Russian).

use chrono::{DateTime, Local, Utc};

use crate::{
    domain::{OperationKind, ProcessOptions, TargetLanguage},
    errors::ValidationError,
    formatting::{escape_html, split_escaped},
    gateway::GatewayError,
    ledger::{LedgerSnapshot, UserProfile},
    messaging::types::{InlineKeyboard, Reply},
};

pub fn welcome() -> Reply {
    Reply::text(
        "🤖 <b>Добро пожаловать в бота для работы с русскими текстами!</b>\n\n\
Я помогу вам:\n\
✅ Проверить грамотность текста\n\
✅ Улучшить написание текста\n\
✅ Сократить текст с сохранением смысла\n\
✅ Перевести текст на другой язык\n\n\
Выберите действие или отправьте команду с текстом:",
    )
    .with_menu(InlineKeyboard::actions(true))
}

/// Shown for free text when nothing is pending.
pub fn choose_action() -> Reply {
    Reply::text("Выберите, что сделать с текстом:").with_menu(InlineKeyboard::actions(true))
}

pub fn help(max_len: usize) -> Reply {
    Reply::text(format!(
        "📚 <b>Как использовать бота:</b>\n\n\
1️⃣ <b>Проверить грамотность</b>: исправляет орфографические и пунктуационные ошибки, сохраняя стиль текста\n\n\
2️⃣ <b>Улучшить текст</b>: исправляет ошибки и улучшает стиль, делая текст более читаемым\n\n\
3️⃣ <b>Сократить текст</b>: убирает лишние слова, сохраняя основную мысль и грамотность\n\n\
4️⃣ <b>Перевести</b>: переводит текст на английский, узбекский, армянский или русский\n\n\
<b>Команды:</b>\n\
/start – главное меню\n\
/help – эта справка\n\
/check [текст] – проверить грамотность\n\
/improve [текст] – улучшить текст\n\
/shorten [текст] – сократить текст\n\
/translate [en|uz|am|ru] [текст] – перевести\n\
/stats – ваша статистика\n\
/cancel – отменить ожидание текста\n\n\
Добавьте слово <code>nodot</code> к команде, чтобы в конце абзацев не было точек.\n\
Пересланное сообщение можно обработать кнопками под ним.\n\n\
Максимальная длина текста: {max_len} символов"
    ))
}

pub fn prompt_for(operation: OperationKind, options: ProcessOptions) -> Reply {
    let text = match operation {
        OperationKind::CheckGrammar => "📝 Отправьте текст для проверки грамотности:".to_string(),
        OperationKind::ImproveText => "✨ Отправьте текст для улучшения:".to_string(),
        OperationKind::ShortenText => "📄 Отправьте текст для сокращения:".to_string(),
        OperationKind::Translate => match options.target_language {
            Some(lang) => format!("🌐 Отправьте текст для перевода ({}):", lang.label()),
            None => "🌐 Отправьте текст для перевода:".to_string(),
        },
    };
    Reply::text(text)
}

pub fn choose_language() -> Reply {
    Reply::text("🌐 Выберите язык перевода:").with_menu(InlineKeyboard::languages())
}

pub fn choose_forward_action() -> Reply {
    Reply::text("📨 Текст получен. Что с ним сделать?").with_menu(InlineKeyboard::actions(false))
}

fn result_header(operation: OperationKind, target: Option<TargetLanguage>) -> String {
    match operation {
        OperationKind::CheckGrammar => "✅ <b>Результат проверки грамотности:</b>".to_string(),
        OperationKind::ImproveText => "✨ <b>Улучшенный текст:</b>".to_string(),
        OperationKind::ShortenText => "📄 <b>Сокращенный текст:</b>".to_string(),
        OperationKind::Translate => match target {
            Some(lang) => format!("🌐 <b>Перевод ({}):</b>", lang.label()),
            None => "🌐 <b>Перевод:</b>".to_string(),
        },
    }
}

/// Header plus escaped result, split so no part exceeds `limit` characters.
pub fn result(
    operation: OperationKind,
    options: ProcessOptions,
    output: &str,
    limit: usize,
) -> Reply {
    let header = result_header(operation, options.target_language);
    let budget = limit.saturating_sub(header.chars().count() + 2);
    let mut parts = split_escaped(output, budget);
    match parts.first_mut() {
        Some(first) => *first = format!("{header}\n\n{first}"),
        None => parts.push(header),
    }
    Reply::parts(parts)
}

pub fn validation(err: &ValidationError) -> Reply {
    let text = match err {
        ValidationError::Empty => "⚠️ Текст пустой. Отправьте текст для обработки.".to_string(),
        ValidationError::TooLong { len, max } => format!(
            "⚠️ Текст слишком длинный: {len} символов. Максимум {max} символов."
        ),
        ValidationError::UnknownOperation(op) => {
            format!("⚠️ Неизвестное действие: {}", escape_html(op))
        }
        ValidationError::MissingTargetLanguage => {
            "⚠️ Не выбран язык перевода. Укажите en, uz, am или ru.".to_string()
        }
    };
    Reply::text(text)
}

pub fn gateway_failure(err: &GatewayError) -> Reply {
    match err {
        GatewayError::Timeout => Reply::text(
            "⏳ Сервис обработки текста не ответил вовремя. Попробуйте позже.",
        ),
        _ => Reply::text("❌ Не удалось обработать текст. Попробуйте позже."),
    }
}

pub fn unknown_command(command: &str) -> Reply {
    Reply::text(format!(
        "Неизвестная команда /{}. Список команд: /help",
        escape_html(command)
    ))
}

pub fn text_only() -> Reply {
    Reply::text("Я работаю только с текстом. Отправьте текстовое сообщение.")
}

pub fn unknown_button() -> Reply {
    Reply::text("Эта кнопка больше не работает. Откройте меню: /start")
}

pub fn cancelled(had_pending: bool) -> Reply {
    if had_pending {
        Reply::text("🚫 Отменено.")
    } else {
        Reply::text("Нечего отменять.")
    }
}

pub fn admin_only() -> Reply {
    Reply::text("⛔ Команда доступна только администраторам.")
}

/// Generic apology used by transports when the real reply could not be sent.
pub const DELIVERY_FAILED: &str = "❌ Произошла ошибка. Попробуйте позже.";

fn local_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d.%m.%Y").to_string()
}

fn local_datetime(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string()
}

pub fn user_stats(profile: &UserProfile) -> Reply {
    let last = profile
        .last_request_at
        .map(local_datetime)
        .unwrap_or_else(|| "ещё не было".to_string());
    Reply::text(format!(
        "📊 <b>Ваша статистика</b>\n\n\
Всего запросов: {}\n\
Сегодня: {}\n\
За неделю: {}\n\n\
С нами с: {}\n\
Последний запрос: {}",
        profile.counters.total,
        profile.counters.today,
        profile.counters.week,
        local_date(profile.joined_at),
        last,
    ))
}

pub fn stats_unavailable() -> Reply {
    Reply::text("Статистика пока недоступна.")
}

fn profile_name(p: &UserProfile) -> String {
    if let Some(username) = p.username.as_deref().filter(|s| !s.is_empty()) {
        return format!("@{}", escape_html(username));
    }
    if let Some(name) = p.display_name.as_deref().filter(|s| !s.is_empty()) {
        return escape_html(name);
    }
    format!("id {}", p.user_id)
}

pub fn admin_stats(snapshot: &LedgerSnapshot) -> Reply {
    let mut out = format!(
        "👑 <b>Статистика бота</b>\n\n\
Пользователей: {}\n\
Всего запросов: {}\n\
Сегодня: {}\n\
За неделю: {}",
        snapshot.total_users,
        snapshot.total_requests,
        snapshot.today_requests,
        snapshot.week_requests,
    );

    if !snapshot.top_users.is_empty() {
        out.push_str("\n\n<b>Топ пользователей:</b>");
        for (i, p) in snapshot.top_users.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {}: {}",
                i + 1,
                profile_name(p),
                p.counters.total
            ));
        }
    }
    if snapshot.skipped_profiles > 0 {
        out.push_str(&format!(
            "\n\n⚠️ Повреждённых записей пропущено: {}",
            snapshot.skipped_profiles
        ));
    }

    Reply::text(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_parts_respect_limit_with_header() {
        let output = "слово ".repeat(300);
        let reply = result(
            OperationKind::ImproveText,
            ProcessOptions::default(),
            &output,
            200,
        );
        assert!(reply.parts.len() > 1);
        assert!(reply.parts[0].starts_with("✨ <b>Улучшенный текст:</b>\n\n"));
        assert!(reply.parts.iter().all(|p| p.chars().count() <= 200));
    }

    #[test]
    fn result_is_escaped() {
        let reply = result(
            OperationKind::CheckGrammar,
            ProcessOptions::default(),
            "a < b",
            4000,
        );
        assert_eq!(reply.parts.len(), 1);
        assert!(reply.parts[0].ends_with("a &lt; b"));
    }

    #[test]
    fn timeout_has_its_own_wording() {
        let timeout = gateway_failure(&GatewayError::Timeout);
        let other = gateway_failure(&GatewayError::Network("reset".into()));
        assert_ne!(timeout, other);
        assert!(!other.parts[0].contains("reset"));
    }

    #[test]
    fn help_mentions_max_length() {
        assert!(help(1234).parts[0].contains("1234 символов"));
    }
}

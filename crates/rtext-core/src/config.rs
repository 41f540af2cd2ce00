use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_YANDEX_API_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

/// Typed configuration, loaded from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_message_limit: usize,
    pub telegram_safe_limit: usize,

    // Gateway (YandexGPT)
    pub yandex_api_key: String,
    pub yandex_folder_id: String,
    pub yandex_model: String,
    pub yandex_api_url: String,
    pub yandex_temperature: f32,
    pub yandex_max_tokens: u32,
    pub gateway_timeout: Duration,

    // Requests
    pub max_text_length: usize,

    // Ledger
    pub users_file: PathBuf,
    pub admin_ids: Vec<i64>,
    pub refresh_profile_names: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_TOKEN")
            .or_else(|| env_str("TELEGRAM_BOT_TOKEN"))
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_TOKEN environment variable is required".to_string())
            })?;
        let yandex_api_key = env_str("YANDEX_API_KEY")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("YANDEX_API_KEY environment variable is required".to_string())
            })?;
        let yandex_folder_id = env_str("YANDEX_FOLDER_ID")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("YANDEX_FOLDER_ID environment variable is required".to_string())
            })?;

        let yandex_model = env_str("YANDEX_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "yandexgpt-lite".to_string());
        let yandex_api_url = env_str("YANDEX_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_YANDEX_API_URL.to_string());
        let yandex_temperature = env_f32("YANDEX_TEMPERATURE")
            .unwrap_or(0.3)
            .clamp(0.0, 1.0);
        let yandex_max_tokens = env_u32("YANDEX_MAX_TOKENS").unwrap_or(2000);
        let gateway_timeout =
            Duration::from_millis(env_u64("GATEWAY_TIMEOUT_MS").unwrap_or(30_000));

        let max_text_length = env_usize("MAX_TEXT_LENGTH").unwrap_or(4000);
        if max_text_length == 0 {
            return Err(Error::Config(
                "MAX_TEXT_LENGTH must be greater than zero".to_string(),
            ));
        }

        // Telegram message limits
        let telegram_message_limit = env_usize("TELEGRAM_MESSAGE_LIMIT").unwrap_or(4096);
        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT")
            .unwrap_or(4000)
            .min(telegram_message_limit);

        let users_file =
            PathBuf::from(env_str("USERS_FILE").unwrap_or_else(|| "users.json".to_string()));
        let admin_ids = parse_csv_i64(env_str("ADMIN_IDS"));
        let refresh_profile_names = env_bool("REFRESH_PROFILE_NAMES").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            telegram_message_limit,
            telegram_safe_limit,
            yandex_api_key,
            yandex_folder_id,
            yandex_model,
            yandex_api_url,
            yandex_temperature,
            yandex_max_tokens,
            gateway_timeout,
            max_text_length,
            users_file,
            admin_ids,
            refresh_profile_names,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_f32(key: &str) -> Option<f32> {
    env_str(key).and_then(|s| s.trim().parse::<f32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_ids_skip_garbage() {
        assert_eq!(
            parse_csv_i64(Some(" 1, 2,,abc, -7 ".to_string())),
            vec![1, 2, -7]
        );
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn dotenv_strips_quotes_comments_and_export() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_TOKEN=\"abc\"\nexport ADMIN_IDS='1,2'\nbroken line\n=nokey\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_TOKEN".to_string(), "abc".to_string()),
                ("ADMIN_IDS".to_string(), "1,2".to_string()),
            ]
        );
    }

    #[test]
    fn bool_values() {
        assert!(parse_bool("Yes"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }
}

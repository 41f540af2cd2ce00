//! Per-user usage ledger backed by a single JSON file.
//!
//! The whole profile set is the unit of durability: every mutation rewrites the
//! file (temp file + rename) while the in-memory lock is held, so a
//! load-modify-save sequence is never interleaved with another one.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{OperationKind, UserId},
    Result,
};

/// Most recent history entries kept per profile.
pub const HISTORY_LIMIT: usize = 100;
pub const TOP_USERS_LIMIT: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counters {
    pub total: u64,
    pub today: u64,
    pub week: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub operation: OperationKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub last_request_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl UserProfile {
    fn new(
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: username.map(str::to_string),
            display_name: display_name.map(str::to_string),
            joined_at: now,
            counters: Counters::default(),
            last_request_at: None,
            history: Vec::new(),
        }
    }

    /// Recompute `today`/`week` from the retained history.
    fn refresh_period_counters(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&Local).date_naive();
        let week = TimeDelta::days(7);

        self.counters.today = self
            .history
            .iter()
            .filter(|e| e.timestamp.with_timezone(&Local).date_naive() == today)
            .count() as u64;
        self.counters.week = self
            .history
            .iter()
            .filter(|e| now.signed_duration_since(e.timestamp) <= week)
            .count() as u64;
    }
}

/// Aggregate statistics over all profiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub total_users: usize,
    pub total_requests: u64,
    pub today_requests: u64,
    pub week_requests: u64,
    pub top_users: Vec<UserProfile>,
    /// Stored records that could not be parsed and were left out of the sums.
    pub skipped_profiles: usize,
}

#[derive(Default)]
struct LedgerState {
    profiles: HashMap<UserId, UserProfile>,
    /// Unparsable records, kept verbatim so a save does not destroy them.
    malformed: BTreeMap<String, serde_json::Value>,
}

pub struct Ledger {
    path: PathBuf,
    admins: HashSet<UserId>,
    refresh_names: bool,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Open the ledger at `path`. Read failures degrade to an empty store.
    pub fn open(path: impl Into<PathBuf>, admin_ids: &[i64]) -> Self {
        let path = path.into();
        let state = load_state(&path);
        tracing::info!(
            path = %path.display(),
            profiles = state.profiles.len(),
            malformed = state.malformed.len(),
            "ledger opened"
        );

        Self {
            path,
            admins: admin_ids.iter().copied().map(UserId).collect(),
            refresh_names: false,
            state: Mutex::new(state),
        }
    }

    /// Overwrite username/display name of existing profiles on every sighting.
    pub fn with_name_refresh(mut self, enabled: bool) -> Self {
        self.refresh_names = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    pub async fn get_or_create(
        &self,
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> UserProfile {
        self.get_or_create_at(user_id, username, display_name, Utc::now())
            .await
    }

    pub async fn get_or_create_at(
        &self,
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> UserProfile {
        let mut state = self.state.lock().await;

        if let Some(profile) = state.profiles.get_mut(&user_id) {
            if !self.refresh_names {
                return profile.clone();
            }
            let fresh_username = username.map(str::to_string);
            let fresh_display = display_name.map(str::to_string);
            if profile.username == fresh_username && profile.display_name == fresh_display {
                return profile.clone();
            }
            profile.username = fresh_username;
            profile.display_name = fresh_display;
            let out = profile.clone();
            self.save(&state).await;
            return out;
        }

        if state.malformed.remove(&user_id.to_string()).is_some() {
            tracing::warn!(user_id = %user_id, "replacing malformed ledger record");
        }
        let profile = UserProfile::new(user_id, username, display_name, now);
        state.profiles.insert(user_id, profile.clone());
        tracing::info!(user_id = %user_id, "new user profile");
        self.save(&state).await;
        profile
    }

    pub async fn record_request(&self, user_id: UserId, operation: OperationKind) {
        self.record_request_at(user_id, operation, Utc::now()).await
    }

    pub async fn record_request_at(
        &self,
        user_id: UserId,
        operation: OperationKind,
        now: DateTime<Utc>,
    ) {
        let mut state = self.state.lock().await;
        let Some(profile) = state.profiles.get_mut(&user_id) else {
            tracing::debug!(user_id = %user_id, "record_request for unknown user ignored");
            return;
        };

        profile.counters.total += 1;
        profile.last_request_at = Some(now);
        profile.history.push(HistoryEntry {
            operation,
            timestamp: now,
        });
        if profile.history.len() > HISTORY_LIMIT {
            let excess = profile.history.len() - HISTORY_LIMIT;
            profile.history.drain(..excess);
        }
        profile.refresh_period_counters(now);

        self.save(&state).await;
    }

    pub async fn get_stats(&self) -> LedgerSnapshot {
        let state = self.state.lock().await;

        for key in state.malformed.keys() {
            tracing::warn!(record = %key, "skipping malformed ledger record in stats");
        }

        let mut snapshot = LedgerSnapshot {
            total_users: state.profiles.len() + state.malformed.len(),
            skipped_profiles: state.malformed.len(),
            ..LedgerSnapshot::default()
        };
        for p in state.profiles.values() {
            snapshot.total_requests += p.counters.total;
            snapshot.today_requests += p.counters.today;
            snapshot.week_requests += p.counters.week;
        }

        let mut ranked: Vec<&UserProfile> = state.profiles.values().collect();
        ranked.sort_by(|a, b| {
            b.counters
                .total
                .cmp(&a.counters.total)
                .then(a.joined_at.cmp(&b.joined_at))
                .then(a.user_id.cmp(&b.user_id))
        });
        snapshot.top_users = ranked
            .into_iter()
            .take(TOP_USERS_LIMIT)
            .cloned()
            .collect();

        snapshot
    }

    pub async fn get_user_stats(&self, user_id: UserId) -> Option<UserProfile> {
        self.get_user_stats_at(user_id, Utc::now()).await
    }

    /// Lazy refresh: period counters are recomputed against `now` on read.
    pub async fn get_user_stats_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Option<UserProfile> {
        let mut state = self.state.lock().await;
        let profile = state.profiles.get_mut(&user_id)?;
        profile.refresh_period_counters(now);
        Some(profile.clone())
    }

    async fn save(&self, state: &LedgerState) {
        if let Err(e) = self.persist(state).await {
            tracing::error!(path = %self.path.display(), "failed to save ledger: {e}");
        }
    }

    async fn persist(&self, state: &LedgerState) -> Result<()> {
        let mut records: BTreeMap<String, serde_json::Value> = state.malformed.clone();
        for (id, profile) in &state.profiles {
            records.insert(id.to_string(), serde_json::to_value(profile)?);
        }
        let json = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "users.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn load_state(path: &Path) -> LedgerState {
    if !path.exists() {
        return LedgerState::default();
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(path = %path.display(), "failed to read ledger, starting empty: {e}");
            return LedgerState::default();
        }
    };
    if raw.trim().is_empty() {
        return LedgerState::default();
    }

    let records: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(path = %path.display(), "corrupt ledger, starting empty: {e}");
            backup_corrupt(path);
            return LedgerState::default();
        }
    };

    let mut state = LedgerState::default();
    for (key, value) in records {
        match serde_json::from_value::<UserProfile>(value.clone()) {
            Ok(profile) if profile.user_id.to_string() == key => {
                state.profiles.insert(profile.user_id, profile);
            }
            Ok(profile) => {
                tracing::warn!(
                    record = %key,
                    user_id = %profile.user_id,
                    "ledger record key does not match its user_id"
                );
                state.malformed.insert(key, value);
            }
            Err(e) => {
                tracing::warn!(record = %key, "malformed ledger record: {e}");
                state.malformed.insert(key, value);
            }
        }
    }
    state
}

fn backup_corrupt(path: &Path) {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "users.json".into());
    name.push(".corrupt");
    let backup = path.with_file_name(name);
    match std::fs::copy(path, &backup) {
        Ok(_) => tracing::warn!(backup = %backup.display(), "corrupt ledger copied aside"),
        Err(e) => tracing::warn!("failed to copy corrupt ledger aside: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    fn ledger_in(dir: &tempfile::TempDir) -> Ledger {
        Ledger::open(dir.path().join("users.json"), &[1])
    }

    #[tokio::test]
    async fn total_counts_every_request() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.get_or_create(UserId(7), Some("ivan"), None).await;

        for _ in 0..7 {
            ledger
                .record_request(UserId(7), OperationKind::ShortenText)
                .await;
        }

        let p = ledger.get_user_stats(UserId(7)).await.unwrap();
        assert_eq!(p.counters.total, 7);
        assert_eq!(p.history.len(), 7);
        assert!(p.last_request_at.is_some());
    }

    #[tokio::test]
    async fn history_is_capped_and_oldest_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.get_or_create(UserId(7), None, None).await;

        let start = at(0, 0);
        ledger
            .record_request_at(UserId(7), OperationKind::Translate, start)
            .await;
        for i in 1..=100 {
            ledger
                .record_request_at(
                    UserId(7),
                    OperationKind::CheckGrammar,
                    start + TimeDelta::seconds(i),
                )
                .await;
        }

        let p = ledger.get_user_stats(UserId(7)).await.unwrap();
        assert_eq!(p.counters.total, 101);
        assert_eq!(p.history.len(), HISTORY_LIMIT);
        assert!(p
            .history
            .iter()
            .all(|e| e.operation == OperationKind::CheckGrammar));
        assert_eq!(p.history[0].timestamp, start + TimeDelta::seconds(1));
    }

    #[tokio::test]
    async fn empty_ledger_stats_are_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        assert_eq!(ledger.get_stats().await, LedgerSnapshot::default());
    }

    #[tokio::test]
    async fn same_day_requests_fill_all_counters() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.get_or_create(UserId(42), None, None).await;

        for m in 0..3 {
            ledger
                .record_request_at(UserId(42), OperationKind::ImproveText, at(12, m))
                .await;
        }

        let p = ledger.get_user_stats_at(UserId(42), at(12, 3)).await.unwrap();
        assert_eq!(
            p.counters,
            Counters {
                total: 3,
                today: 3,
                week: 3
            }
        );
    }

    #[tokio::test]
    async fn period_counters_follow_now() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.get_or_create(UserId(5), None, None).await;

        let now = at(12, 0);
        for ts in [now - TimeDelta::days(8), now - TimeDelta::days(3), now] {
            ledger
                .record_request_at(UserId(5), OperationKind::CheckGrammar, ts)
                .await;
        }

        let p = ledger.get_user_stats_at(UserId(5), now).await.unwrap();
        assert_eq!(p.counters.total, 3);
        assert_eq!(p.counters.week, 2);
        assert_eq!(p.counters.today, 1);

        // Lazy refresh: ten days later nothing is recent any more.
        let later = ledger
            .get_user_stats_at(UserId(5), now + TimeDelta::days(10))
            .await
            .unwrap();
        assert_eq!(later.counters.week, 0);
        assert_eq!(later.counters.today, 0);
        assert_eq!(later.counters.total, 3);
    }

    #[tokio::test]
    async fn unknown_user_is_silently_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        ledger
            .record_request(UserId(99), OperationKind::CheckGrammar)
            .await;

        assert!(ledger.get_user_stats(UserId(99)).await.is_none());
        assert!(!ledger.path().exists());
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_and_keeps_first_names() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let first = ledger
            .get_or_create_at(UserId(3), Some("old"), Some("Old"), at(9, 0))
            .await;
        ledger.record_request(UserId(3), OperationKind::Translate).await;
        let again = ledger
            .get_or_create_at(UserId(3), Some("new"), Some("New"), at(10, 0))
            .await;

        assert_eq!(again.username.as_deref(), Some("old"));
        assert_eq!(again.joined_at, first.joined_at);
        assert_eq!(again.counters.total, 1);
    }

    #[tokio::test]
    async fn name_refresh_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir).with_name_refresh(true);

        ledger.get_or_create(UserId(3), Some("old"), None).await;
        let again = ledger.get_or_create(UserId(3), Some("new"), Some("Нов")).await;

        assert_eq!(again.username.as_deref(), Some("new"));
        assert_eq!(again.display_name.as_deref(), Some("Нов"));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = ledger_in(&dir);
            ledger.get_or_create(UserId(8), Some("a"), Some("A")).await;
            ledger.record_request(UserId(8), OperationKind::ImproveText).await;
            ledger.record_request(UserId(8), OperationKind::ImproveText).await;
        }

        let reopened = ledger_in(&dir);
        let p = reopened.get_user_stats(UserId(8)).await.unwrap();
        assert_eq!(p.counters.total, 2);
        assert_eq!(p.username.as_deref(), Some("a"));
        assert_eq!(p.history.len(), 2);
        assert!(!temp_path(reopened.path()).exists());
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let ledger = Ledger::open(&path, &[]);
        assert_eq!(ledger.get_stats().await.total_users, 0);
        assert!(dir.path().join("users.json.corrupt").exists());

        ledger.get_or_create(UserId(1), None, None).await;
        assert_eq!(ledger.get_stats().await.total_users, 1);
    }

    #[tokio::test]
    async fn malformed_record_is_skipped_and_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let raw = serde_json::json!({
            "1": { "user_id": 1, "counters": { "total": 4, "today": 1, "week": 2 } },
            "2": { "user_id": "not-a-number", "counters": "broken" }
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let ledger = Ledger::open(&path, &[]);
        let stats = ledger.get_stats().await;
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.skipped_profiles, 1);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.today_requests, 1);
        assert_eq!(stats.week_requests, 2);

        // A save keeps the broken record untouched.
        ledger.get_or_create(UserId(3), None, None).await;
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["2"]["counters"], "broken");
        assert_eq!(saved["3"]["user_id"], 3);
    }

    #[tokio::test]
    async fn record_under_foreign_key_is_kept_as_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{"5":{"user_id":6,"counters":{"total":3}},"6":{"user_id":6,"counters":{"total":9}}}"#,
        )
        .unwrap();

        let ledger = Ledger::open(&path, &[]);
        let stats = ledger.get_stats().await;
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.skipped_profiles, 1);
        assert_eq!(stats.total_requests, 9);
        assert_eq!(ledger.get_user_stats(UserId(6)).await.unwrap().counters.total, 9);
        assert!(ledger.get_user_stats(UserId(5)).await.is_none());

        ledger.record_request(UserId(6), OperationKind::CheckGrammar).await;
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["5"]["user_id"], 6);
        assert_eq!(saved["5"]["counters"]["total"], 3);
        assert_eq!(saved["6"]["counters"]["total"], 10);
    }

    #[tokio::test]
    async fn failed_write_keeps_in_memory_counters() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a regular file").unwrap();
        let path = blocker.join("users.json");

        let ledger = Ledger::open(&path, &[]);
        ledger.get_or_create(UserId(7), Some("ivan"), None).await;
        ledger.record_request(UserId(7), OperationKind::ImproveText).await;

        let p = ledger.get_user_stats(UserId(7)).await.unwrap();
        assert_eq!(p.counters.total, 1);
        assert_eq!(p.history.len(), 1);
        assert_eq!(ledger.get_stats().await.total_users, 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn records_with_missing_or_unknown_fields_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"{"5": {"user_id": 5, "future_field": true}}"#).unwrap();

        let ledger = Ledger::open(&path, &[]);
        let p = ledger.get_user_stats(UserId(5)).await.unwrap();
        assert_eq!(p.counters, Counters::default());
        assert!(p.history.is_empty());
        assert!(p.username.is_none());
    }

    #[tokio::test]
    async fn top_users_sorted_with_deterministic_ties() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        // (id, joined minute, requests)
        let users = [(10, 5, 2), (11, 1, 2), (12, 0, 9), (13, 2, 0), (14, 3, 1), (15, 4, 2)];
        for (id, joined, requests) in users {
            ledger
                .get_or_create_at(UserId(id), None, None, at(8, joined))
                .await;
            for _ in 0..requests {
                ledger
                    .record_request(UserId(id), OperationKind::CheckGrammar)
                    .await;
            }
        }

        let stats = ledger.get_stats().await;
        let order: Vec<i64> = stats.top_users.iter().map(|p| p.user_id.0).collect();
        assert_eq!(order, vec![12, 11, 15, 10, 14]);
        assert_eq!(stats.total_users, 6);
        assert_eq!(stats.total_requests, 16);
    }

    #[test]
    fn admin_membership() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("users.json"), &[1, 2]);
        assert!(ledger.is_admin(UserId(2)));
        assert!(!ledger.is_admin(UserId(3)));
    }
}

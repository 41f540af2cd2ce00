//! Per-user pending operation table.
//!
//! At most one state per user. `set_*` overwrites, `take_pending` reads and
//! clears in one critical section. States never expire on their own.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{OperationKind, ProcessOptions, UserId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PendingState {
    #[default]
    None,
    /// The next free-text message is the input for `operation`.
    AwaitingText {
        operation: OperationKind,
        options: ProcessOptions,
    },
    /// A forwarded text waits for the user to pick an action.
    ///
    /// `operation` is `None` until an action is chosen; it is `Some` while a
    /// follow-up choice (target language) is still missing.
    AwaitingForwardedText {
        operation: Option<OperationKind>,
        text: String,
        options: ProcessOptions,
    },
}

impl PendingState {
    pub fn is_none(&self) -> bool {
        matches!(self, PendingState::None)
    }
}

#[derive(Default)]
pub struct PendingStates {
    inner: Mutex<HashMap<UserId, PendingState>>,
}

impl PendingStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_pending(&self, user_id: UserId, operation: OperationKind) {
        self.set_pending_with(user_id, operation, ProcessOptions::default())
            .await
    }

    pub async fn set_pending_with(
        &self,
        user_id: UserId,
        operation: OperationKind,
        options: ProcessOptions,
    ) {
        self.put(
            user_id,
            PendingState::AwaitingText { operation, options },
        )
        .await
    }

    pub async fn set_pending_forward(
        &self,
        user_id: UserId,
        operation: Option<OperationKind>,
        text: impl Into<String>,
        options: ProcessOptions,
    ) {
        self.put(
            user_id,
            PendingState::AwaitingForwardedText {
                operation,
                text: text.into(),
                options,
            },
        )
        .await
    }

    /// Return the current state and clear it.
    pub async fn take_pending(&self, user_id: UserId) -> PendingState {
        self.inner
            .lock()
            .await
            .remove(&user_id)
            .unwrap_or_default()
    }

    pub async fn has_pending(&self, user_id: UserId) -> bool {
        self.inner.lock().await.contains_key(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    async fn put(&self, user_id: UserId, state: PendingState) {
        let mut map = self.inner.lock().await;
        if let Some(prev) = map.insert(user_id, state) {
            tracing::debug!(user_id = %user_id, ?prev, "pending state overwritten");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn take_is_terminal() {
        let p = PendingStates::new();
        p.set_pending(UserId(1), OperationKind::CheckGrammar).await;

        assert_eq!(
            p.take_pending(UserId(1)).await,
            PendingState::AwaitingText {
                operation: OperationKind::CheckGrammar,
                options: ProcessOptions::default(),
            }
        );
        assert_eq!(p.take_pending(UserId(1)).await, PendingState::None);
    }

    #[tokio::test]
    async fn set_overwrites_instead_of_queueing() {
        let p = PendingStates::new();
        p.set_pending(UserId(1), OperationKind::CheckGrammar).await;
        p.set_pending(UserId(1), OperationKind::ShortenText).await;

        match p.take_pending(UserId(1)).await {
            PendingState::AwaitingText { operation, .. } => {
                assert_eq!(operation, OperationKind::ShortenText)
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(p.take_pending(UserId(1)).await.is_none());
    }

    #[tokio::test]
    async fn states_are_per_user() {
        let p = PendingStates::new();
        p.set_pending(UserId(1), OperationKind::ImproveText).await;
        p.set_pending_forward(
            UserId(2),
            None,
            "пересланный текст",
            ProcessOptions::default(),
        )
        .await;
        assert_eq!(p.len().await, 2);
        assert!(p.has_pending(UserId(2)).await);
        assert!(!p.has_pending(UserId(3)).await);

        assert_eq!(
            p.take_pending(UserId(2)).await,
            PendingState::AwaitingForwardedText {
                operation: None,
                text: "пересланный текст".to_string(),
                options: ProcessOptions::default(),
            }
        );
        assert!(!p.take_pending(UserId(1)).await.is_none());
        assert!(p.is_empty().await);
    }

    #[tokio::test]
    async fn forward_overwrites_text_wait() {
        let p = PendingStates::new();
        p.set_pending(UserId(1), OperationKind::ImproveText).await;
        p.set_pending_forward(
            UserId(1),
            Some(OperationKind::Translate),
            "abc",
            ProcessOptions::default(),
        )
        .await;

        assert!(matches!(
            p.take_pending(UserId(1)).await,
            PendingState::AwaitingForwardedText {
                operation: Some(OperationKind::Translate),
                ..
            }
        ));
    }
}

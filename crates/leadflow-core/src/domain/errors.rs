//! Errors - エラー型と分類
//!
//! - **StoreError**: リポジトリ（ports）が返す永続化エラー
//! - **LeadError**: ステートマシンの公開操作が返すエラー
//! - **ErrorKind**: 呼び出し側が分岐するための運用分類

use thiserror::Error;

use super::ids::{LeadId, LeadTimerId};
use super::state::LeadState;
use super::transitions::describe_allowed;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: インフラエラー（ストアの障害）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Permanent)
    }
}

/// Errors surfaced by the repository ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Compare-and-swap lost: the stored state moved since it was read.
    #[error("lead {lead_id} state changed concurrently: expected {expected}, found {actual}")]
    StateConflict {
        lead_id: LeadId,
        expected: LeadState,
        actual: LeadState,
    },

    #[error("lead {0} not found")]
    LeadNotFound(LeadId),

    #[error("timer {0} not found")]
    TimerNotFound(LeadTimerId),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors returned by [`crate::app::LeadMachine`] operations.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// `allowed` is the full allowed set of `from`, listed in the message.
    #[error(
        "cannot transition lead from {from} to {to}; allowed: {}",
        describe_allowed(.allowed)
    )]
    InvalidTransition {
        from: LeadState,
        to: LeadState,
        allowed: Vec<LeadState>,
    },

    /// Concurrent writers kept winning the compare-and-swap.
    #[error("lead {lead_id} kept changing concurrently; gave up after {attempts} attempts")]
    Conflict { lead_id: LeadId, attempts: u32 },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl LeadError {
    pub fn lead_not_found(id: LeadId) -> Self {
        LeadError::NotFound {
            entity: "lead",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LeadError::NotFound { .. } | LeadError::InvalidTransition { .. } => {
                ErrorKind::Permanent
            }
            LeadError::Conflict { .. } => ErrorKind::Transient,
            LeadError::Persistence(StoreError::StateConflict { .. }) => ErrorKind::Transient,
            LeadError::Persistence(StoreError::LeadNotFound(_))
            | LeadError::Persistence(StoreError::TimerNotFound(_)) => ErrorKind::Permanent,
            LeadError::Persistence(StoreError::Backend(_)) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transitions::valid_transitions;

    #[test]
    fn invalid_transition_message_lists_allowed_states() {
        let err = LeadError::InvalidTransition {
            from: LeadState::New,
            to: LeadState::Closed,
            allowed: valid_transitions(LeadState::New),
        };
        assert_eq!(
            err.to_string(),
            "cannot transition lead from new to closed; allowed: touched, suppressed"
        );
    }

    #[test]
    fn invalid_transition_from_terminal_says_so() {
        let err = LeadError::InvalidTransition {
            from: LeadState::Closed,
            to: LeadState::Touched,
            allowed: vec![],
        };
        assert!(err.to_string().ends_with("allowed: none (terminal state)"));
    }

    #[test]
    fn classification_drives_retry() {
        let lead_id = LeadId::random();

        assert_eq!(LeadError::lead_not_found(lead_id).kind(), ErrorKind::Permanent);
        assert!(!LeadError::lead_not_found(lead_id).is_retryable());

        let conflict = LeadError::Conflict { lead_id, attempts: 3 };
        assert_eq!(conflict.kind(), ErrorKind::Transient);
        assert!(conflict.is_retryable());

        let backend = LeadError::from(StoreError::Backend("connection reset".into()));
        assert_eq!(backend.kind(), ErrorKind::Infrastructure);
        assert!(backend.is_retryable());
        assert_eq!(backend.to_string(), "store backend failure: connection reset");
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let lead_id = LeadId::random();
        let msg = LeadError::lead_not_found(lead_id).to_string();
        assert_eq!(msg, format!("lead not found: {lead_id}"));
    }
}

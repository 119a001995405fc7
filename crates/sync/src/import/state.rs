//! Import run state.
//!
//! One explicit state object replaces loose process-wide flags. It is loaded
//! and saved whole through an [`ImportStateStore`]; `begin`, `finish` and
//! `abort` are the only transitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::RepositoryError;

/// Outcome of a finished import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Products fanned out into import tasks.
    pub processed: u64,
    /// Batch-level error that ended the run early, if any.
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    /// Whether this was the first import of the shop.
    #[serde(default)]
    pub initial: bool,
}

/// Persisted import run state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportState {
    pub in_progress: bool,
    pub last_started: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
    pub last_stats: Option<ImportSummary>,
    /// The running import is the shop's first.
    pub is_initial_import: bool,
    /// Set once an initial import has completed; never cleared.
    pub initial_import_complete: bool,
    /// The running import was requested as a catch-up sync.
    pub catchup_sync: bool,
}

impl ImportState {
    /// Enter `IN_PROGRESS`.
    ///
    /// Refuses (returns `false`) if an import is already in progress, unless `force`.
    pub fn begin(
        &mut self,
        now: DateTime<Utc>,
        force: bool,
        is_initial: bool,
        catchup: bool,
    ) -> bool {
        if self.in_progress && !force {
            return false;
        }
        self.in_progress = true;
        self.last_started = Some(now);
        self.is_initial_import = is_initial;
        self.catchup_sync = catchup;
        true
    }

    /// Leave `IN_PROGRESS`, recording the run's summary.
    ///
    /// Returns `None` (and changes nothing) if no import is in progress.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        processed: u64,
        error: Option<String>,
    ) -> Option<ImportSummary> {
        if !self.in_progress {
            return None;
        }

        let summary = ImportSummary {
            processed,
            error,
            started_at: self.last_started,
            completed_at: now,
            initial: self.is_initial_import,
        };

        self.in_progress = false;
        self.last_completed = Some(now);
        self.last_stats = Some(summary.clone());
        if self.is_initial_import {
            self.is_initial_import = false;
            self.initial_import_complete = true;
        }
        self.catchup_sync = false;

        Some(summary)
    }

    /// Leave `IN_PROGRESS` without recording a completion. Returns whether an
    /// import was in progress.
    pub const fn abort(&mut self) -> bool {
        let was_running = self.in_progress;
        self.in_progress = false;
        self.is_initial_import = false;
        self.catchup_sync = false;
        was_running
    }
}

/// Load/save of the import state.
#[async_trait]
pub trait ImportStateStore: Send + Sync {
    /// Current state, or the default (idle) state if none was ever saved.
    async fn load(&self) -> Result<ImportState, RepositoryError>;

    async fn save(&self, state: &ImportState) -> Result<(), RepositoryError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_refuses_while_in_progress() {
        let now = Utc::now();
        let mut state = ImportState::default();
        assert!(state.begin(now, false, false, false));
        assert!(!state.begin(now, false, false, true));
        assert!(!state.catchup_sync);
        assert!(state.in_progress);
    }

    #[test]
    fn test_force_overrides_in_progress() {
        let now = Utc::now();
        let mut state = ImportState::default();
        state.begin(now, false, false, true);
        assert!(state.begin(now, true, true, false));
        assert!(state.is_initial_import);
        assert!(!state.catchup_sync);
    }

    #[test]
    fn test_finish_promotes_initial_flag() {
        let now = Utc::now();
        let mut state = ImportState::default();
        state.begin(now, false, true, false);

        let summary = state.finish(now, 12, None).unwrap();
        assert_eq!(summary.processed, 12);
        assert!(summary.initial);
        assert!(!state.in_progress);
        assert!(!state.is_initial_import);
        assert!(state.initial_import_complete);
        assert_eq!(state.last_completed, Some(now));
        assert_eq!(state.last_stats, Some(summary));
    }

    #[test]
    fn test_catchup_flag_lasts_for_one_run() {
        let now = Utc::now();
        let mut state = ImportState::default();
        assert!(state.begin(now, false, false, true));
        assert!(state.catchup_sync);

        state.finish(now, 3, None).unwrap();
        assert!(!state.catchup_sync);
    }

    #[test]
    fn test_finish_when_idle_is_ignored() {
        let mut state = ImportState::default();
        assert!(state.finish(Utc::now(), 1, None).is_none());
        assert!(state.last_completed.is_none());
    }

    #[test]
    fn test_abort_clears_run_flags() {
        let mut state = ImportState::default();
        state.begin(Utc::now(), false, true, true);
        assert!(state.abort());
        assert!(!state.in_progress);
        assert!(!state.catchup_sync);
        assert!(!state.initial_import_complete);
        assert!(!state.abort());
    }

    #[test]
    fn test_deserialize_partial_state() {
        let state: ImportState = serde_json::from_str(r#"{"in_progress": true}"#).unwrap();
        assert!(state.in_progress);
        assert!(state.last_started.is_none());
    }
}

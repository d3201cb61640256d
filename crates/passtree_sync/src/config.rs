//! Configuration for the merge engine.

use passtree_core::HistoryPolicy;

/// Configuration for merge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Prune entry history after merging.
    pub maintain_backups: bool,
    /// Policy used for pruning; `None` uses the local database's policy.
    pub history_policy: Option<HistoryPolicy>,
}

impl MergeConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            maintain_backups: true,
            history_policy: None,
        }
    }

    /// Enables or disables history pruning after the merge.
    pub fn with_maintain_backups(mut self, maintain: bool) -> Self {
        self.maintain_backups = maintain;
        self
    }

    /// Overrides the history policy of the local database.
    pub fn with_history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.history_policy = Some(policy);
        self
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new()
    }
}

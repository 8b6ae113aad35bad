//! Engine configuration.
//!
//! Deserializable with defaults for every field, and buildable in code:
//!
//! ```
//! use u_exam_schedule::config::EngineConfig;
//! use u_exam_schedule::locks::LockScope;
//!
//! let config = EngineConfig::default()
//!     .with_lock_scope(LockScope::ExamDate)
//!     .with_max_batch_size_limit(20);
//! assert_eq!(config.max_batch_size_limit, Some(20));
//! ```

use serde::{Deserialize, Serialize};

use crate::locks::LockScope;

/// Runtime settings for [`crate::engine::ExamScheduler`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Granularity of the mutation serialization domain.
    pub lock_scope: LockScope,
    /// Upper bound accepted for `max_students_per_batch`. `None` = unbounded.
    pub max_batch_size_limit: Option<usize>,
    /// Accept moves between batches on different dates.
    pub allow_cross_date_moves: bool,
}

impl EngineConfig {
    /// Sets the lock scope.
    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = scope;
        self
    }

    /// Sets the batch size limit.
    pub fn with_max_batch_size_limit(mut self, limit: usize) -> Self {
        self.max_batch_size_limit = Some(limit);
        self
    }

    /// Allows or forbids cross-date moves.
    pub fn with_cross_date_moves(mut self, allow: bool) -> Self {
        self.allow_cross_date_moves = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.lock_scope, LockScope::Date);
        assert_eq!(c.max_batch_size_limit, None);
        assert!(!c.allow_cross_date_moves);
    }

    #[test]
    fn test_deserialize_partial() {
        let c: EngineConfig =
            serde_json::from_str(r#"{"lock_scope": "exam_date", "max_batch_size_limit": 20}"#)
                .unwrap();
        assert_eq!(c.lock_scope, LockScope::ExamDate);
        assert_eq!(c.max_batch_size_limit, Some(20));
        assert!(!c.allow_cross_date_moves);

        let empty: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EngineConfig::default());
    }
}

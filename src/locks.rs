//! Keyed serialization domains.
//!
//! Mutations of the batches belonging to one key are mutually
//! exclusive; different keys proceed in parallel. A request that spans
//! several keys acquires them in key order, so two such requests can
//! never wait on each other in a cycle.

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::ExamId;

/// Granularity of the serialization domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    /// One domain per (exam, date).
    ExamDate,
    /// One domain per date, shared by every exam on that date.
    #[default]
    Date,
}

/// Key of one serialization domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockKey {
    pub date: NaiveDate,
    /// `None` under [`LockScope::Date`].
    pub exam_id: Option<ExamId>,
}

/// Held serialization domains; released on drop.
#[derive(Debug)]
pub struct DomainGuard {
    keys: Vec<LockKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl DomainGuard {
    /// Keys held by this guard, in acquisition order.
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

/// Table of per-key async mutexes.
#[derive(Debug, Default)]
pub struct LockTable {
    scope: LockScope,
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl LockTable {
    /// Creates an empty table.
    pub fn new(scope: LockScope) -> Self {
        Self {
            scope,
            locks: DashMap::new(),
        }
    }

    /// The configured scope.
    pub fn scope(&self) -> LockScope {
        self.scope
    }

    /// Maps an (exam, date) pair onto its domain key.
    pub fn key(&self, exam_id: ExamId, date: NaiveDate) -> LockKey {
        match self.scope {
            LockScope::ExamDate => LockKey {
                date,
                exam_id: Some(exam_id),
            },
            LockScope::Date => LockKey {
                date,
                exam_id: None,
            },
        }
    }

    /// Acquires every domain touched by `pairs`.
    ///
    /// Duplicate keys are collapsed and keys are locked in ascending
    /// order.
    pub async fn acquire(
        &self,
        pairs: impl IntoIterator<Item = (ExamId, NaiveDate)>,
    ) -> DomainGuard {
        let mut keys: Vec<LockKey> = pairs
            .into_iter()
            .map(|(exam_id, date)| self.key(exam_id, date))
            .collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            // Clone out of the map before awaiting so no shard lock is held
            // across the await.
            let mutex = self
                .locks
                .entry(*key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            guards.push(mutex.lock_owned().await);
        }

        DomainGuard {
            keys,
            _guards: guards,
        }
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune_idle(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    /// Number of tracked domains.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no domain is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

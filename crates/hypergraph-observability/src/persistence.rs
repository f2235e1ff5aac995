// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Row-append persistence contract
//!
//! The substrate never assumes durability. Callers log failures and move on.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

pub type RunId = i64;

/// Append-only store for learning statistics and reward history
pub trait PersistenceSink: Send + Sync {
    /// Open a run and return its id
    fn begin_run(&self, meta_json: &str) -> Result<RunId, PersistenceError>;

    fn insert_learning_stats(
        &self,
        ts_ms: i64,
        step: u64,
        hz: f64,
        stats_blob: &str,
        run_id: RunId,
    ) -> Result<(), PersistenceError>;

    fn insert_reward_log(
        &self,
        ts_ms: i64,
        step: u64,
        reward: f32,
        source: &str,
        ctx_json: &str,
        run_id: RunId,
    ) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatsRow {
    pub ts_ms: i64,
    pub step: u64,
    pub hz: f64,
    pub stats_blob: String,
    pub run_id: RunId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRow {
    pub ts_ms: i64,
    pub step: u64,
    pub reward: f32,
    pub source: String,
    pub ctx_json: String,
    pub run_id: RunId,
}

#[derive(Default)]
struct Tables {
    runs: Vec<String>,
    learning_stats: Vec<LearningStatsRow>,
    rewards: Vec<RewardRow>,
}

/// In-memory persistence; `set_failing(true)` makes every call error
#[derive(Default)]
pub struct MemoryPersistence {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn runs(&self) -> Vec<String> {
        self.tables.lock().runs.clone()
    }

    pub fn learning_stats(&self) -> Vec<LearningStatsRow> {
        self.tables.lock().learning_stats.clone()
    }

    pub fn rewards(&self) -> Vec<RewardRow> {
        self.tables.lock().rewards.clone()
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(PersistenceError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

fn check_run(tables: &Tables, run_id: RunId) -> Result<(), PersistenceError> {
    if run_id < 1 || run_id as usize > tables.runs.len() {
        return Err(PersistenceError::UnknownRun(run_id));
    }
    Ok(())
}

impl PersistenceSink for MemoryPersistence {
    fn begin_run(&self, meta_json: &str) -> Result<RunId, PersistenceError> {
        self.check_available()?;
        serde_json::from_str::<serde_json::Value>(meta_json)
            .map_err(|e| PersistenceError::Rejected(format!("run metadata is not JSON: {}", e)))?;

        let mut tables = self.tables.lock();
        tables.runs.push(meta_json.to_string());
        Ok(tables.runs.len() as RunId)
    }

    fn insert_learning_stats(
        &self,
        ts_ms: i64,
        step: u64,
        hz: f64,
        stats_blob: &str,
        run_id: RunId,
    ) -> Result<(), PersistenceError> {
        self.check_available()?;
        let mut tables = self.tables.lock();
        check_run(&tables, run_id)?;
        tables.learning_stats.push(LearningStatsRow {
            ts_ms,
            step,
            hz,
            stats_blob: stats_blob.to_string(),
            run_id,
        });
        Ok(())
    }

    fn insert_reward_log(
        &self,
        ts_ms: i64,
        step: u64,
        reward: f32,
        source: &str,
        ctx_json: &str,
        run_id: RunId,
    ) -> Result<(), PersistenceError> {
        self.check_available()?;
        let mut tables = self.tables.lock();
        check_run(&tables, run_id)?;
        tables.rewards.push(RewardRow {
            ts_ms,
            step,
            reward,
            source: source.to_string(),
            ctx_json: ctx_json.to_string(),
            run_id,
        });
        Ok(())
    }
}

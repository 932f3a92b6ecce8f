// ABOUTME: Daily LLM request quota with calendar-day rollover and SQLite persistence
// ABOUTME: Degrades to a memory-only counter when the persistence layer is unavailable
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Quota Tracker
//!
//! Process-wide daily counter gating LLM invocations. The counter resets when
//! the local calendar date changes and every mutation is flushed to the
//! `api_quota` table so the count survives restarts. FAQ-served replies never
//! touch the quota.
//!
//! Persistence failures must never fail the request path: on a read or write
//! error the tracker logs a warning and continues with the in-memory counter
//! for the rest of the process lifetime.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Persisted quota state: today's count and the date it belongs to
#[derive(Debug, Clone, Copy)]
struct QuotaState {
    request_count_today: u32,
    last_reset_date: NaiveDate,
}

/// Read-only quota snapshot for the status endpoint
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
}

/// Daily LLM request quota tracker
pub struct QuotaTracker {
    pool: SqlitePool,
    limit: u32,
    state: Mutex<QuotaState>,
    /// Set after the first persistence failure; suppresses repeated warnings
    degraded: AtomicBool,
}

impl QuotaTracker {
    /// Create a tracker, reloading persisted state from the database
    ///
    /// A load failure is not fatal: the tracker starts from zero in
    /// memory-only mode, matching the degradation policy for writes.
    pub async fn new(pool: SqlitePool, limit: u32) -> Self {
        let today = Local::now().date_naive();
        let (state, degraded) = match Self::load(&pool).await {
            Ok(Some(state)) => (state, false),
            Ok(None) => (
                QuotaState {
                    request_count_today: 0,
                    last_reset_date: today,
                },
                false,
            ),
            Err(e) => {
                warn!(error = %e, "failed to load quota state, continuing memory-only");
                (
                    QuotaState {
                        request_count_today: 0,
                        last_reset_date: today,
                    },
                    true,
                )
            }
        };

        info!(
            used = state.request_count_today,
            limit, "quota tracker initialized"
        );

        Self {
            pool,
            limit,
            state: Mutex::new(state),
            degraded: AtomicBool::new(degraded),
        }
    }

    /// Check the quota and consume one unit if allowed
    ///
    /// Performs the date-rollover check first, then denies without mutating
    /// state when the limit is reached, otherwise increments and persists.
    pub async fn check_and_consume(&self) -> bool {
        let mut state = self.state.lock().await;
        self.roll_over_if_new_day(&mut state).await;

        if state.request_count_today >= self.limit {
            return false;
        }

        state.request_count_today += 1;
        self.persist(&state).await;
        true
    }

    /// Whether the daily budget is already spent, without consuming
    pub async fn is_exhausted(&self) -> bool {
        let mut state = self.state.lock().await;
        self.roll_over_if_new_day(&mut state).await;
        state.request_count_today >= self.limit
    }

    /// Read-only snapshot; performs the rollover check but never increments
    pub async fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock().await;
        self.roll_over_if_new_day(&mut state).await;

        QuotaStatus {
            limit: self.limit,
            used: state.request_count_today,
            remaining: self.limit.saturating_sub(state.request_count_today),
        }
    }

    async fn roll_over_if_new_day(&self, state: &mut QuotaState) {
        let today = Local::now().date_naive();
        if today != state.last_reset_date {
            info!(
                previous = %state.last_reset_date,
                used = state.request_count_today,
                "new day, resetting request count"
            );
            state.request_count_today = 0;
            state.last_reset_date = today;
            self.persist(state).await;
        }
    }

    /// Flush state to the `api_quota` singleton row, degrading on failure
    async fn persist(&self, state: &QuotaState) {
        let result = sqlx::query(
            r"
            INSERT INTO api_quota (id, request_count_today, last_reset_date)
            VALUES (1, $1, $2)
            ON CONFLICT(id) DO UPDATE
            SET request_count_today = $1, last_reset_date = $2
            ",
        )
        .bind(i64::from(state.request_count_today))
        .bind(state.last_reset_date.to_string())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            if !self.degraded.swap(true, Ordering::Relaxed) {
                warn!(error = %e, "quota persistence failed, continuing memory-only");
            }
        }
    }

    async fn load(pool: &SqlitePool) -> Result<Option<QuotaState>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT request_count_today, last_reset_date FROM api_quota WHERE id = 1",
        )
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let count: i64 = row.try_get("request_count_today")?;
        let date_str: String = row.try_get("last_reset_date")?;
        let last_reset_date = date_str.parse::<NaiveDate>().unwrap_or_else(|_| {
            warn!(value = %date_str, "unparseable quota reset date, resetting to today");
            Local::now().date_naive()
        });

        Ok(Some(QuotaState {
            request_count_today: u32::try_from(count).unwrap_or(0),
            last_reset_date,
        }))
    }

    #[cfg(test)]
    pub(crate) async fn set_state_for_test(&self, count: u32, date: NaiveDate) {
        let mut state = self.state.lock().await;
        state.request_count_today = count;
        state.last_reset_date = date;
    }
}

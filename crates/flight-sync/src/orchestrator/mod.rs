//! Sync orchestrator - runs one reconciliation pass.

use crate::config::{Config, SyncConfig};
use crate::crew::CrewCountLookup;
use crate::error::{Result, SyncError};
use crate::index::RecordIndex;
use crate::notify::{self, Notifier};
use crate::reconcile::Reconciler;
use crate::source::{MssqlSource, SourceStore};
use crate::target::{BulkWriter, MssqlTarget, TargetStore};
use crate::transform::transform_row;
use chrono::{Days, Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Inclusive sector-date range covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SyncWindow {
    /// `[today - lookback_days, today + lookahead_days]`.
    ///
    /// Negative offsets or a range past the calendar limits are a config error.
    pub fn for_today(today: NaiveDate, config: &SyncConfig) -> Result<Self> {
        let out_of_range = || {
            SyncError::Config(format!(
                "sync window around {} is out of range (lookback_days {}, lookahead_days {})",
                today, config.lookback_days, config.lookahead_days
            ))
        };
        let lookback = u64::try_from(config.lookback_days).map_err(|_| out_of_range())?;
        let lookahead = u64::try_from(config.lookahead_days).map_err(|_| out_of_range())?;

        Ok(Self {
            from: today
                .checked_sub_days(Days::new(lookback))
                .ok_or_else(out_of_range)?,
            to: today
                .checked_add_days(Days::new(lookahead))
                .ok_or_else(out_of_range)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Result of a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// `completed`, or `partial` when a row failed to transform.
    pub status: String,

    pub window: SyncWindow,

    pub started_at: NaiveDateTime,
    pub completed_at: NaiveDateTime,
    pub duration_seconds: f64,

    pub source_rows: usize,
    pub target_rows: usize,
    pub crew_groups: usize,

    /// Rows transformed before the loop stopped.
    pub transformed: usize,
    /// Transformed rows whose sector date fell outside the window.
    pub out_of_window: usize,

    pub inserted: u64,
    pub updated: u64,
    pub unchanged: usize,
    /// Source rows replaced by a later row with the same key.
    pub superseded: usize,
    /// Target rows sharing a key with an earlier target row.
    pub target_duplicates: usize,

    /// Error text of the row that stopped the loop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_error: Option<String>,
}

impl SyncSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_partial(&self) -> bool {
        self.transform_error.is_some()
    }
}

/// Runs reconciliation passes against the configured stores.
pub struct SyncOrchestrator {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    writer: Arc<dyn BulkWriter>,
    notifier: Arc<dyn Notifier>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    /// Wire SQL Server stores and the configured notifier.
    pub fn new(config: &Config) -> Result<Self> {
        let source = Arc::new(MssqlSource::new(config.source.clone())?);
        let target = Arc::new(MssqlTarget::new(config.target.clone()));
        let notifier = notify::from_config(&config.notify)?;
        Ok(Self::with_components(
            source,
            target.clone(),
            target,
            notifier,
            config.sync.clone(),
        ))
    }

    pub fn with_components(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        writer: Arc<dyn BulkWriter>,
        notifier: Arc<dyn Notifier>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            target,
            writer,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// Run one pass for the current local time.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SyncSummary> {
        self.run_at(Local::now().naive_local(), cancel).await
    }

    /// Run one pass as if the clock read `now`.
    pub async fn run_at(&self, now: NaiveDateTime, cancel: &CancellationToken) -> Result<SyncSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let window = SyncWindow::for_today(now.date(), &self.config)?;
        info!("Starting sync run {} for {}..{}", run_id, window.from, window.to);

        check_cancelled(cancel)?;
        let source_rows = self.source.fetch_source_window(window.from, window.to).await?;

        check_cancelled(cancel)?;
        let target_rows = self.target.fetch_target_window(window.from, window.to).await?;
        let target_count = target_rows.len();
        let index = RecordIndex::build(target_rows);
        if index.duplicates() > 0 {
            warn!("{} duplicate target keys ignored", index.duplicates());
        }

        check_cancelled(cancel)?;
        let crew_rows = self.source.fetch_crew_counts(window.from, window.to).await?;
        let crew = CrewCountLookup::from_rows(crew_rows);
        info!(
            "Snapshots loaded: {} source rows, {} target records, {} crew groups",
            source_rows.len(),
            index.len(),
            crew.len()
        );

        let mut reconciler = Reconciler::new(&index, now);
        let mut transformed = 0usize;
        let mut out_of_window = 0usize;
        let mut transform_error = None;

        for (position, row) in source_rows.iter().enumerate() {
            let record = match transform_row(row, &crew) {
                Ok(record) => record,
                Err(e) => {
                    let message = format!("Transform failed at source row {}: {}", position + 1, e);
                    warn!("{}; stopping row loop and flushing batches", message);
                    self.send_notification(&message).await;
                    transform_error = Some(message);
                    break;
                }
            };
            transformed += 1;

            if !window.contains(record.sector_date) {
                out_of_window += 1;
                continue;
            }
            reconciler.push(record);
        }

        let mut batches = reconciler.finish();
        // Stamp with the write time, measured on the run clock.
        let written_at = Duration::from_std(started.elapsed())
            .ok()
            .and_then(|elapsed| now.checked_add_signed(elapsed))
            .unwrap_or(now);
        batches.restamp(written_at);
        info!(
            "Reconciled: {} inserts, {} updates, {} unchanged",
            batches.inserts.len(),
            batches.updates.len(),
            batches.unchanged
        );

        check_cancelled(cancel)?;
        let inserted = self.writer.bulk_insert(&batches.inserts).await?;

        check_cancelled(cancel)?;
        let updated = self.writer.bulk_update_via_merge(&batches.updates).await?;

        let completed_at = Local::now().naive_local();
        let summary = SyncSummary {
            run_id,
            status: if transform_error.is_some() { "partial" } else { "completed" }.to_string(),
            window,
            started_at: now,
            completed_at,
            duration_seconds: started.elapsed().as_secs_f64(),
            source_rows: source_rows.len(),
            target_rows: target_count,
            crew_groups: crew.len(),
            transformed,
            out_of_window,
            inserted,
            updated,
            unchanged: batches.unchanged,
            superseded: batches.superseded,
            target_duplicates: index.duplicates(),
            transform_error,
        };

        info!(
            "Sync {}: {} inserted, {} updated in {:.1}s",
            summary.status, summary.inserted, summary.updated, summary.duration_seconds
        );
        Ok(summary)
    }

    /// Deliver a notification; failures are logged and dropped.
    pub(crate) async fn send_notification(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message).await {
            warn!("Failed to send notification: {}", e);
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        info!("Cancellation requested, stopping run");
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

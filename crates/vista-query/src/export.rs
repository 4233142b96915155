//! CSV export.
//!
//! A full export runs inside one read-only transaction: the rows are
//! declared as a server-side cursor and fetched in bounded batches, so the
//! result set is never materialised in memory. Any failure after the
//! transaction begins rolls it back before the connection is returned.
//!
//! The work is split into [`ExportStreamer::open`] and [`ExportCursor::pump`]
//! so that a caller can still report an error cleanly while nothing has
//! been written.

use crate::csv::CsvEncoder;
use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::plan::QueryPlan;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;
use vista_policy::{ExportQuota, QuotaCheck, QuotaVerdict};

const CURSOR_NAME: &str = "vista_export";

/// Destination for CSV chunks.
#[async_trait]
pub trait ExportSink: Send {
    async fn send(&mut self, chunk: String) -> Result<(), QueryError>;
}

#[async_trait]
impl ExportSink for Vec<u8> {
    async fn send(&mut self, chunk: String) -> Result<(), QueryError> {
        self.extend_from_slice(chunk.as_bytes());
        Ok(())
    }
}

/// Sink feeding a bounded channel, typically drained by an HTTP body.
pub struct ChannelSink {
    tx: mpsc::Sender<Result<String, io::Error>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Result<String, io::Error>>) -> Self {
        Self { tx }
    }

    /// A sink and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Result<String, io::Error>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Tell the receiver the stream ended abnormally.
    pub async fn fail(&self, message: impl Into<String>) {
        // Nobody to tell if the receiver is gone.
        let _ = self.tx.send(Err(io::Error::other(message.into()))).await;
    }
}

#[async_trait]
impl ExportSink for ChannelSink {
    async fn send(&mut self, chunk: String) -> Result<(), QueryError> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| QueryError::StreamingFailure("client disconnected".to_string()))
    }
}

fn streaming(err: sqlx::Error) -> QueryError {
    QueryError::StreamingFailure(err.to_string())
}

pub struct ExportStreamer {
    executor: Arc<QueryExecutor>,
    batch_size: u32,
}

impl ExportStreamer {
    pub fn new(executor: Arc<QueryExecutor>, batch_size: u32) -> Self {
        Self {
            executor,
            batch_size: batch_size.max(1),
        }
    }

    /// Count the plan's rows now and compare them with `quota`.
    pub async fn check_quota(
        &self,
        plan: &QueryPlan,
        quota: &ExportQuota,
    ) -> Result<QuotaCheck, QueryError> {
        let total = self.executor.count(plan).await?;
        Ok(quota.check(total))
    }

    /// Begin a read-only snapshot transaction, re-count inside it, enforce
    /// `quota` and declare the cursor. The cursor sees exactly the rows that
    /// were counted.
    pub async fn open(&self, plan: &QueryPlan, quota: &ExportQuota) -> Result<ExportCursor, QueryError> {
        let export_id = Uuid::new_v4();
        let pool = self.executor.registry().get_pool(&plan.database).await?;
        let mut tx = pool.begin().await?;

        let declared = async {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;

            let count = plan.count_sql();
            let total: i64 = sqlx::query_scalar_with(&count, plan.arguments()?)
                .fetch_one(&mut *tx)
                .await?;
            let check = quota.check(u64::try_from(total).unwrap_or(0));
            enforce(&check, quota, plan)?;

            let declare = format!(
                "DECLARE {} NO SCROLL CURSOR FOR {}",
                CURSOR_NAME,
                plan.full_sql()
            );
            sqlx::query_with(&declare, plan.arguments()?)
                .persistent(false)
                .execute(&mut *tx)
                .await?;
            Ok::<_, QueryError>(check)
        }
        .await;

        let check = match declared {
            Ok(check) => check,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(export_id = %export_id, error = %rollback, "Rollback failed");
                }
                return Err(err);
            }
        };

        tracing::info!(
            export_id = %export_id,
            database = %plan.database,
            table = %plan.table,
            total_count = check.total_count,
            "Opened export cursor"
        );

        Ok(ExportCursor {
            export_id,
            database: plan.database.clone(),
            table: plan.table.full_name(),
            check,
            tx,
            encoder: CsvEncoder::new(plan.column_names()),
            batch_size: self.batch_size,
        })
    }

    /// Full filtered export: count, enforce the quota, then stream every row.
    pub async fn stream<S: ExportSink + ?Sized>(
        &self,
        plan: &QueryPlan,
        quota: &ExportQuota,
        sink: &mut S,
    ) -> Result<u64, QueryError> {
        let cursor = self.open(plan, quota).await?;
        cursor.pump(sink).await
    }

    /// Export the plan's current page only; bounded by the page size, not the quota.
    pub async fn export_page<S: ExportSink + ?Sized>(
        &self,
        plan: &QueryPlan,
        sink: &mut S,
    ) -> Result<u64, QueryError> {
        let page = self.executor.execute(plan).await?;
        let encoder = CsvEncoder::new(plan.column_names());

        let mut out = encoder.header_line();
        for row in &page.rows {
            out.push_str(&encoder.encode_row(row));
        }
        sink.send(out).await?;

        tracing::info!(
            database = %plan.database,
            table = %plan.table,
            page = page.page,
            rows = page.rows.len(),
            "Exported page"
        );
        Ok(page.rows.len() as u64)
    }
}

/// Turn a refused quota check into its error.
fn enforce(check: &QuotaCheck, quota: &ExportQuota, plan: &QueryPlan) -> Result<(), QueryError> {
    let err = match check.verdict {
        QuotaVerdict::TooLarge => QueryError::ExportTooLarge {
            total_count: check.total_count,
            cap: quota.absolute_cap,
        },
        QuotaVerdict::QuotaExceeded => QueryError::ExportQuotaExceeded {
            total_count: check.total_count,
            limit: quota.max_rows_for_role,
        },
        QuotaVerdict::Allowed | QuotaVerdict::NeedsConfirmation => return Ok(()),
    };
    tracing::warn!(
        database = %plan.database,
        table = %plan.table,
        total_count = check.total_count,
        "Export refused: {}",
        err
    );
    Err(err)
}

/// An open export transaction with its cursor declared.
pub struct ExportCursor {
    export_id: Uuid,
    database: String,
    table: String,
    check: QuotaCheck,
    tx: Transaction<'static, Postgres>,
    encoder: CsvEncoder,
    batch_size: u32,
}

impl ExportCursor {
    pub fn export_id(&self) -> Uuid {
        self.export_id
    }

    /// The quota check made inside this cursor's snapshot.
    pub fn quota_check(&self) -> &QuotaCheck {
        &self.check
    }

    /// Write the header and every row, then commit. Rolls back on any failure.
    pub async fn pump<S: ExportSink + ?Sized>(mut self, sink: &mut S) -> Result<u64, QueryError> {
        let span = tracing::info_span!(
            "export",
            export_id = %self.export_id,
            database = %self.database,
            table = %self.table
        );

        async move {
            let result = self.write_all(sink).await;
            let ExportCursor { tx, .. } = self;

            match result {
                Ok(rows) => {
                    tx.commit().await.map_err(streaming)?;
                    tracing::info!(rows, "Export complete");
                    Ok(rows)
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!(error = %rollback, "Rollback failed");
                    }
                    tracing::error!(error = %err, "Export aborted");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn write_all<S: ExportSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64, QueryError> {
        sink.send(self.encoder.header_line()).await?;

        let fetch = format!("FETCH FORWARD {} FROM {}", self.batch_size, CURSOR_NAME);
        let mut total = 0u64;
        loop {
            let rows: Vec<Value> = sqlx::query_scalar(&fetch)
                .persistent(false)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(streaming)?;
            if rows.is_empty() {
                break;
            }

            let mut chunk = String::new();
            for row in &rows {
                chunk.push_str(&self.encoder.encode_row(row));
            }
            sink.send(chunk).await?;
            total += rows.len() as u64;
            tracing::debug!(total, "Wrote batch");
        }

        sqlx::query(&format!("CLOSE {}", CURSOR_NAME))
            .execute(&mut *self.tx)
            .await
            .map_err(streaming)?;
        Ok(total)
    }
}

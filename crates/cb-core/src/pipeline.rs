//! The concurrent report pipeline: bounded worker pool and stream merger.

use crate::error::ReportError;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::queries::{self, ReportFilter};
use crate::schema::ReportRow;
use crate::transform;
use cb_client::{CollectionQuery, RecordSource, TierParameterSource};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

/// Worker pool width used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// One merged-stream element.
pub type RowResult = Result<ReportRow, ReportError>;

#[derive(Clone, Copy, Debug)]
enum SourceKind {
    Request,
    Subscription,
}

/// The report pipeline over a record source and a tier parameter source.
///
/// A run proceeds in two waves: every request record is dispatched and
/// drained before the first subscription record is dispatched. Within a
/// wave, records complete in any order; rows belonging to one record stay
/// contiguous.
pub struct ReportPipeline {
    source: Arc<dyn RecordSource>,
    tiers: Arc<dyn TierParameterSource>,
    concurrency: usize,
}

impl ReportPipeline {
    pub fn new(source: Arc<dyn RecordSource>, tiers: Arc<dyn TierParameterSource>) -> Self {
        Self {
            source,
            tiers,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Overrides the worker pool width.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs the report, returning a lazy, single-pass stream of rows.
    ///
    /// Both sources are counted up front to fix the progress total; the
    /// sink is then notified once per completed record. Fetch-layer errors
    /// are forwarded into the stream and end the run.
    pub async fn run(
        &self,
        filter: &ReportFilter,
        sink: Option<ProgressSink>,
    ) -> Result<ReceiverStream<RowResult>, ReportError> {
        let request_query = queries::request_query(filter);
        let billing_query = queries::billing_query(filter);

        let total =
            self.source.count(&request_query).await? + self.source.count(&billing_query).await?;
        let progress = Arc::new(ProgressTracker::new(total, sink));
        info!(total, concurrency = self.concurrency, "report run starting");

        let (tx, rx) = mpsc::channel(256);
        let source = Arc::clone(&self.source);
        let tiers = Arc::clone(&self.tiers);
        let concurrency = self.concurrency;

        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let waves = [
                (request_query, SourceKind::Request),
                (billing_query, SourceKind::Subscription),
            ];
            let mut rows = 0u64;
            let mut skips = 0u64;

            for (query, kind) in waves {
                let wave = run_wave(WaveContext {
                    source: &source,
                    tiers: &tiers,
                    progress: &progress,
                    semaphore: &semaphore,
                    tx: &tx,
                    query,
                    kind,
                });
                match wave.await {
                    Ok((wave_rows, wave_skips)) => {
                        rows += wave_rows;
                        skips += wave_skips;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            info!(
                rows,
                skipped_items = skips,
                processed = progress.current(),
                "report run finished"
            );
        });

        Ok(ReceiverStream::new(rx))
    }
}

struct WaveContext<'a> {
    source: &'a Arc<dyn RecordSource>,
    tiers: &'a Arc<dyn TierParameterSource>,
    progress: &'a Arc<ProgressTracker>,
    semaphore: &'a Arc<Semaphore>,
    tx: &'a mpsc::Sender<RowResult>,
    query: CollectionQuery,
    kind: SourceKind,
}

/// Dispatches every record of one source, then drains completions in
/// completion order, flattening each record's rows into the output channel.
async fn run_wave(ctx: WaveContext<'_>) -> Result<(u64, u64), ReportError> {
    let mut tasks: JoinSet<transform::RecordOutput> = JoinSet::new();

    {
        let mut records = ctx.source.records(&ctx.query);
        while let Some(record) = records.next().await {
            let record = record?;
            let tiers = Arc::clone(ctx.tiers);
            let progress = Arc::clone(ctx.progress);
            let semaphore = Arc::clone(ctx.semaphore);
            let kind = ctx.kind;
            tasks.spawn(async move {
                // The semaphore is never closed while tasks hold it.
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let output = match kind {
                    SourceKind::Request => {
                        transform::transform_request(&record, tiers.as_ref()).await
                    }
                    SourceKind::Subscription => {
                        transform::transform_subscription(&record, tiers.as_ref()).await
                    }
                };
                progress.increment();
                output
            });
        }
    }

    let mut rows = 0u64;
    let mut skips = 0u64;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(output) => {
                for skip in &output.skips {
                    skips += 1;
                    warn!(
                        record = %skip.record_id,
                        item = %skip.item_id,
                        reason = %skip.reason,
                        "item skipped"
                    );
                }
                for row in output.rows {
                    rows += 1;
                    if ctx.tx.send(Ok(row)).await.is_err() {
                        // Consumer dropped the stream; nothing left to do.
                        tasks.abort_all();
                        return Ok((rows, skips));
                    }
                }
            }
            Err(e) => warn!(error = %e, "transform task failed"),
        }
    }

    Ok((rows, skips))
}

//! Concurrent retrieval across all date partitions.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::acquisition::fetcher::PagedFetcher;
use crate::export::links::{generate_links, LinkLog};
use crate::model::{DatePartition, Declaration};
use crate::pool;

/// Aggregate outcome of one retrieval pass.
#[derive(Debug, Default)]
pub struct RetrievalSummary {
    /// Partition results appended in completion order.
    pub records: Vec<Declaration>,
    pub partitions_ok: usize,
    pub partitions_failed: usize,
}

/// Runs one fetch task per partition in a bounded group.
pub struct Retrieval<'a> {
    fetcher: &'a PagedFetcher,
    workers: usize,
    link_log: Option<Arc<Mutex<LinkLog>>>,
    detail_base: String,
}

impl<'a> Retrieval<'a> {
    pub fn new(fetcher: &'a PagedFetcher, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            link_log: None,
            detail_base: String::new(),
        }
    }

    /// Append detail-page links for each finished partition to `log`.
    pub fn with_link_log(mut self, log: Arc<Mutex<LinkLog>>, detail_base: &str) -> Self {
        self.link_log = Some(log);
        self.detail_base = detail_base.to_string();
        self
    }

    /// Fetch every partition. A failed partition is logged and counted as
    /// empty; it never stops the others.
    pub async fn run(&self, partitions: Vec<DatePartition>) -> RetrievalSummary {
        let total = partitions.len();
        info!(
            "retrieving {total} partition(s) with {} worker(s)",
            self.workers
        );

        let tasks = pool::bounded(partitions, self.workers, |partition| async move {
            let result = self.fetcher.fetch_partition(&partition).await;
            if let (Ok(records), Some(log)) = (&result, &self.link_log) {
                let links = generate_links(records, &self.detail_base);
                if let Err(e) = log.lock().await.append(&links) {
                    warn!("partition {partition}: failed to record links: {e:#}");
                }
            }
            (partition, result)
        });
        let mut results = std::pin::pin!(tasks);

        let mut summary = RetrievalSummary::default();
        while let Some((partition, result)) = results.next().await {
            match result {
                Ok(records) => {
                    info!(
                        "partition {partition}: {} declaration(s) [{}/{total}]",
                        records.len(),
                        summary.partitions_ok + summary.partitions_failed + 1
                    );
                    summary.partitions_ok += 1;
                    summary.records.extend(records);
                }
                Err(e) => {
                    warn!("partition {partition}: giving up, counted as empty: {e}");
                    summary.partitions_failed += 1;
                }
            }
        }

        info!(
            "retrieval finished: {} declaration(s), {} partition(s) failed",
            summary.records.len(),
            summary.partitions_failed
        );
        summary
    }
}

/// Fetch every partition with `workers` concurrent tasks.
pub async fn retrieve_all(
    fetcher: &PagedFetcher,
    partitions: Vec<DatePartition>,
    workers: usize,
) -> RetrievalSummary {
    Retrieval::new(fetcher, workers).run(partitions).await
}

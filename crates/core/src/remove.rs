//! Batched object removal
//!
//! [`remove_objects`] drains a stream of identifiers, groups them into batches
//! of at most [`RemoveObjectsOptions::batch_size`] and issues one batch delete
//! per group. Objects the store refuses are reported on the returned
//! [`RemoveErrors`] stream; successful removals produce nothing.

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::types::{ObjectToDelete, RemoveObjectError, RemoveSummary};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, warn};

/// Most keys a single batch delete may carry
pub const MAX_DELETE_BATCH: usize = 1000;

/// Issues batch deletes
#[async_trait]
pub trait BatchDeleter: Send + Sync + 'static {
    /// Delete `objects` in one call and return the objects the store refused.
    ///
    /// An `Err` means the call as a whole failed.
    async fn delete_batch(
        &self,
        bucket: &str,
        objects: &[ObjectToDelete],
        options: &RemoveObjectsOptions,
    ) -> Result<Vec<RemoveObjectError>>;
}

#[derive(Debug, Clone)]
pub struct RemoveObjectsOptions {
    pub batch_size: usize,
    /// Remove objects under governance-mode retention
    pub bypass_governance: bool,
}

impl Default for RemoveObjectsOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_DELETE_BATCH,
            bypass_governance: false,
        }
    }
}

impl From<&TransferConfig> for RemoveObjectsOptions {
    fn from(transfer: &TransferConfig) -> Self {
        Self::default().with_batch_size(transfer.delete_batch_size)
    }
}

impl RemoveObjectsOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_bypass_governance(mut self, bypass: bool) -> Self {
        self.bypass_governance = bypass;
        self
    }
}

/// Failures of a removal run, in the order the store reported them.
pub struct RemoveErrors {
    inner: UnboundedReceiverStream<RemoveObjectError>,
    task: JoinHandle<Result<RemoveSummary>>,
}

impl RemoveErrors {
    /// Wait for the consumer to finish.
    ///
    /// Returns the systemic error that stopped the run early, if any. Unread
    /// item failures are discarded.
    pub async fn finish(self) -> Result<RemoveSummary> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("Removal task failed: {}", e)))?
    }
}

impl Stream for RemoveErrors {
    type Item = RemoveObjectError;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Remove every object yielded by `objects` from `bucket`.
///
/// Identifiers are neither deduplicated nor reordered. A batch call that fails
/// outright reports each of its objects as failed; when the failure is a
/// transport failure the run stops there, otherwise the next batch is attempted.
pub fn remove_objects<D, S>(
    deleter: Arc<D>,
    bucket: impl Into<String>,
    objects: S,
    options: RemoveObjectsOptions,
) -> RemoveErrors
where
    D: BatchDeleter + ?Sized,
    S: Stream<Item = ObjectToDelete> + Send + 'static,
{
    let bucket = bucket.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(consume(deleter, bucket, objects, options, tx));

    RemoveErrors {
        inner: UnboundedReceiverStream::new(rx),
        task,
    }
}

async fn consume<D, S>(
    deleter: Arc<D>,
    bucket: String,
    objects: S,
    options: RemoveObjectsOptions,
    tx: mpsc::UnboundedSender<RemoveObjectError>,
) -> Result<RemoveSummary>
where
    D: BatchDeleter + ?Sized,
    S: Stream<Item = ObjectToDelete> + Send + 'static,
{
    let batch_size = options.batch_size.clamp(1, MAX_DELETE_BATCH);
    // `chunks` yields the trailing partial batch once the input closes.
    let mut batches = Box::pin(objects.chunks(batch_size));
    let mut summary = RemoveSummary::default();

    while let Some(batch) = batches.next().await {
        summary.batches += 1;
        debug!(bucket = %bucket, batch = summary.batches, count = batch.len(), "removing batch");

        let failures = match deleter.delete_batch(&bucket, &batch, &options).await {
            Ok(failures) => failures,
            Err(e) => {
                let cause = e.to_string();
                summary.failed += batch.len();
                for object in &batch {
                    let _ = tx.send(RemoveObjectError::new(object, cause.as_str()));
                }
                if e.is_transport() {
                    error!(bucket = %bucket, batch = summary.batches, error = %e, "store unreachable, stopping removal");
                    return Err(e);
                }
                warn!(bucket = %bucket, batch = summary.batches, error = %e, "batch removal rejected");
                continue;
            }
        };

        summary.failed += failures.len();
        summary.deleted += batch.len().saturating_sub(failures.len());
        for failure in failures {
            let _ = tx.send(failure);
        }
    }

    debug!(bucket = %bucket, batches = summary.batches, deleted = summary.deleted, failed = summary.failed, "removal finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDeleter {
        batches: Mutex<Vec<Vec<String>>>,
        /// key -> cause for objects the store refuses
        refused: HashMap<String, String>,
        /// batch number (1-based) whose call fails outright
        failing_batch: Option<(usize, fn() -> Error)>,
    }

    #[async_trait]
    impl BatchDeleter for RecordingDeleter {
        async fn delete_batch(
            &self,
            _bucket: &str,
            objects: &[ObjectToDelete],
            _options: &RemoveObjectsOptions,
        ) -> Result<Vec<RemoveObjectError>> {
            let number = {
                let mut batches = self.batches.lock().unwrap();
                batches.push(objects.iter().map(|o| o.key.clone()).collect());
                batches.len()
            };

            if let Some((failing, make_error)) = self.failing_batch {
                if failing == number {
                    return Err(make_error());
                }
            }

            Ok(objects
                .iter()
                .filter_map(|o| self.refused.get(&o.key).map(|cause| RemoveObjectError::new(o, cause.as_str())))
                .collect())
        }
    }

    fn keys(count: usize) -> Vec<ObjectToDelete> {
        (0..count).map(|i| ObjectToDelete::new(format!("obj-{:04}", i))).collect()
    }

    #[tokio::test]
    async fn test_single_failure_in_second_batch() {
        let deleter = Arc::new(RecordingDeleter {
            refused: HashMap::from([("obj-0004".to_string(), "AccessDenied: Access Denied".to_string())]),
            ..Default::default()
        });

        let mut errors = remove_objects(
            deleter.clone(),
            "bucket",
            futures::stream::iter(keys(8)),
            RemoveObjectsOptions::default().with_batch_size(3),
        );

        let mut failures = Vec::new();
        while let Some(failure) = errors.next().await {
            failures.push(failure);
        }
        let summary = errors.finish().await.unwrap();

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].object_name, "obj-0004");
        assert_eq!(failures[0].cause, "AccessDenied: Access Denied");
        assert_eq!(summary, RemoveSummary { batches: 3, deleted: 7, failed: 1 });

        let sizes: Vec<usize> = deleter.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 2]);
    }

    #[tokio::test]
    async fn test_empty_input_finishes() {
        let deleter = Arc::new(RecordingDeleter::default());
        let errors = remove_objects(deleter.clone(), "bucket", futures::stream::empty(), RemoveObjectsOptions::default());

        let failures: Vec<RemoveObjectError> = errors.collect().await;
        assert!(failures.is_empty());
        assert!(deleter.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_submitted_twice() {
        let deleter = Arc::new(RecordingDeleter::default());
        let input = vec![ObjectToDelete::new("same"), ObjectToDelete::new("same")];

        let summary = remove_objects(deleter.clone(), "bucket", futures::stream::iter(input), RemoveObjectsOptions::default())
            .finish()
            .await
            .unwrap();

        assert_eq!(summary.deleted, 2);
        assert_eq!(*deleter.batches.lock().unwrap(), vec![vec!["same".to_string(), "same".to_string()]]);
    }

    #[tokio::test]
    async fn test_rejected_batch_continues() {
        let deleter = Arc::new(RecordingDeleter {
            failing_batch: Some((1, || Error::S3Operation("SlowDown".to_string()))),
            ..Default::default()
        });

        let mut errors = remove_objects(
            deleter.clone(),
            "bucket",
            futures::stream::iter(keys(4)),
            RemoveObjectsOptions::default().with_batch_size(2),
        );

        let mut failed = Vec::new();
        while let Some(failure) = errors.next().await {
            failed.push(failure.object_name);
        }
        let summary = errors.finish().await.unwrap();

        assert_eq!(failed, vec!["obj-0000", "obj-0001"]);
        assert_eq!(summary, RemoveSummary { batches: 2, deleted: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_transport_failure_stops_run() {
        let deleter = Arc::new(RecordingDeleter {
            failing_batch: Some((2, || Error::Transport("dns error".to_string()))),
            ..Default::default()
        });

        let errors = remove_objects(
            deleter.clone(),
            "bucket",
            futures::stream::iter(keys(10)),
            RemoveObjectsOptions::default().with_batch_size(2),
        );

        let result = errors.finish().await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(deleter.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_size_clamped() {
        let deleter = Arc::new(RecordingDeleter::default());
        let summary = remove_objects(
            deleter.clone(),
            "bucket",
            futures::stream::iter(keys(3)),
            RemoveObjectsOptions::default().with_batch_size(0),
        )
        .finish()
        .await
        .unwrap();

        assert_eq!(summary.batches, 3);
    }

    #[tokio::test]
    async fn test_options_from_transfer_config() {
        let transfer = TransferConfig {
            delete_batch_size: 2,
            ..TransferConfig::default()
        };
        let options = RemoveObjectsOptions::from(&transfer);
        assert_eq!(options.batch_size, 2);
        assert!(!options.bypass_governance);

        let deleter = Arc::new(RecordingDeleter::default());
        let summary = remove_objects(deleter.clone(), "bucket", futures::stream::iter(keys(5)), options)
            .finish()
            .await
            .unwrap();

        assert_eq!(summary.batches, 3);
        let sizes: Vec<usize> = deleter.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }
}

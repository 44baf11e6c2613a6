//! Streaming object listing
//!
//! [`list_objects`] spawns a producer task that walks a listing page by page
//! and publishes every record on an unbounded channel as soon as its page
//! arrives. The receiving side is an [`ObjectStream`]:
//!
//! - records arrive in store order, pages concatenated;
//! - a failed page fetch yields exactly one `Err` and ends the stream;
//! - the cancellation token is checked before every page fetch, and dropping
//!   or closing the stream cancels the producer.

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::types::{ListPage, ObjectInfo, ObjectToDelete};
use async_trait::async_trait;
use futures::{future, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

/// Default and maximum number of keys per listing call
pub const MAX_KEYS_PER_PAGE: i32 = 1000;

/// Source of listing pages
#[async_trait]
pub trait ObjectLister: Send + Sync + 'static {
    /// Fetch one page. `continuation_token` is `None` for the first page.
    async fn list_page(
        &self,
        bucket: &str,
        options: &ListObjectsOptions,
        continuation_token: Option<&str>,
    ) -> Result<ListPage>;
}

/// What to list
#[derive(Debug, Clone)]
pub struct ListObjectsOptions {
    pub prefix: String,
    /// Descend into "directories" instead of returning common prefixes
    pub recursive: bool,
    pub max_keys: i32,
    pub start_after: Option<String>,
}

impl Default for ListObjectsOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            recursive: false,
            max_keys: MAX_KEYS_PER_PAGE,
            start_after: None,
        }
    }
}

impl ListObjectsOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Listing options for `prefix` with the configured page size
    pub fn from_config(prefix: impl Into<String>, transfer: &TransferConfig) -> Self {
        let page_size = i32::try_from(transfer.list_page_size).unwrap_or(MAX_KEYS_PER_PAGE);
        Self::new(prefix).with_max_keys(page_size)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Keys per listing call, clamped to `1..=1000`
    pub fn with_max_keys(mut self, max_keys: i32) -> Self {
        self.max_keys = max_keys.clamp(1, MAX_KEYS_PER_PAGE);
        self
    }

    /// `max_keys` as sent to the store, clamped to `1..=1000`
    pub fn page_size(&self) -> i32 {
        self.max_keys.clamp(1, MAX_KEYS_PER_PAGE)
    }

    pub fn with_start_after(mut self, start_after: impl Into<String>) -> Self {
        self.start_after = Some(start_after.into());
        self
    }
}

/// Lazy, forward-only sequence of listed objects.
///
/// An `Err` item is terminal: nothing follows it.
pub struct ObjectStream {
    inner: UnboundedReceiverStream<Result<ObjectInfo>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl ObjectStream {
    /// Ask the producer to stop. Records already published stay readable.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the producer, discard unread records and wait for the task to exit.
    pub async fn close(self) -> Result<()> {
        let ObjectStream {
            inner,
            cancel,
            task,
            _guard,
        } = self;
        cancel.cancel();
        drop(inner);
        task.await
            .map_err(|e| Error::Other(format!("Listing task failed: {}", e)))
    }
}

impl Stream for ObjectStream {
    type Item = Result<ObjectInfo>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// List `bucket` under `options.prefix`, streaming records as pages arrive.
///
/// The producer observes a child of `cancel`, so cancelling the caller's token
/// stops it, while closing the returned stream leaves the caller's token alone.
pub fn list_objects<L>(
    lister: Arc<L>,
    bucket: impl Into<String>,
    options: ListObjectsOptions,
    cancel: &CancellationToken,
) -> ObjectStream
where
    L: ObjectLister + ?Sized,
{
    let bucket = bucket.into();
    let cancel = cancel.child_token();
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(produce(lister, bucket, options, tx, cancel.clone()));

    ObjectStream {
        inner: UnboundedReceiverStream::new(rx),
        _guard: cancel.clone().drop_guard(),
        cancel,
        task,
    }
}

async fn produce<L>(
    lister: Arc<L>,
    bucket: String,
    options: ListObjectsOptions,
    tx: mpsc::UnboundedSender<Result<ObjectInfo>>,
    cancel: CancellationToken,
) where
    L: ObjectLister + ?Sized,
{
    let mut continuation_token: Option<String> = None;
    let mut page = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!(bucket = %bucket, prefix = %options.prefix, page, "listing cancelled");
            return;
        }

        page += 1;
        let result = lister
            .list_page(&bucket, &options, continuation_token.as_deref())
            .await;

        let ListPage {
            objects,
            common_prefixes,
            next_continuation_token,
        } = match result {
            Ok(listed) => listed,
            Err(e) => {
                warn!(bucket = %bucket, prefix = %options.prefix, page, error = %e, "listing failed");
                let _ = tx.send(Err(e));
                return;
            }
        };
        debug!(bucket = %bucket, page, count = objects.len() + common_prefixes.len(), "listed page");

        for object in merge_prefixes(objects, common_prefixes) {
            if cancel.is_cancelled() || tx.send(Ok(object)).is_err() {
                debug!(bucket = %bucket, page, "listing consumer gone");
                return;
            }
        }

        match next_continuation_token {
            Some(token) if !token.is_empty() => continuation_token = Some(token),
            _ => return,
        }
    }
}

/// Interleave a page's objects and common prefixes, both already key ordered.
fn merge_prefixes(objects: Vec<ObjectInfo>, prefixes: Vec<String>) -> Vec<ObjectInfo> {
    if prefixes.is_empty() {
        return objects;
    }

    let mut merged = Vec::with_capacity(objects.len() + prefixes.len());
    let mut objects = objects.into_iter().peekable();
    let mut prefixes = prefixes.into_iter().map(ObjectInfo::prefix).peekable();

    loop {
        let take_object = match (objects.peek(), prefixes.peek()) {
            (Some(object), Some(prefix)) => object.key <= prefix.key,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_object {
            objects.next()
        } else {
            prefixes.next()
        };
        merged.extend(next);
    }

    merged
}

/// Read at most `limit` records, then stop the producer.
///
/// Returns the first error terminator instead of the records when one is hit.
pub async fn take_objects(mut stream: ObjectStream, limit: usize) -> Result<Vec<ObjectInfo>> {
    let mut objects = Vec::with_capacity(limit.min(MAX_KEYS_PER_PAGE as usize));

    while objects.len() < limit {
        match stream.next().await {
            Some(Ok(object)) => objects.push(object),
            Some(Err(e)) => {
                stream.close().await?;
                return Err(e);
            }
            None => break,
        }
    }

    stream.close().await?;
    Ok(objects)
}

/// Adapt a listing into removal identifiers.
///
/// Prefix entries are skipped; the stream ends at the error terminator, which is logged.
pub fn deletable(stream: ObjectStream) -> impl Stream<Item = ObjectToDelete> + Send + 'static {
    stream
        .take_while(|item| {
            if let Err(e) = item {
                warn!(error = %e, "listing ended with an error, no further objects queued for removal");
            }
            future::ready(item.is_ok())
        })
        .filter_map(|item| {
            future::ready(
                item.ok()
                    .filter(|object| !object.is_prefix)
                    .map(ObjectToDelete::from),
            )
        })
}

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use serde_json::{json, Map, Value};

use super::error::{TransferError, TransferResult};
use super::summary::sum_object;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Upper bound for one whole wave; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
        }
    }
}

/// Summary entry for a row whose save failed.
pub fn error_result(message: &str) -> Value {
    json!({ "error": { "entity": 1, "errors": message } })
}

/// Save `items` in waves of `batch_size`.
///
/// Saves inside a wave run concurrently, waves run one after another. A failed
/// save is counted in the summary and does not stop its wave. `on_completed`
/// fires once per finished row, success or not. Dropping the returned future
/// abandons the in-flight wave.
pub async fn import_in_batches<'a, T, F, Fut>(
    items: &'a [T],
    options: &BatchOptions,
    save: F,
    on_completed: impl Fn(),
) -> TransferResult<Value>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    let mut total = Map::new();
    let batch_size = options.batch_size.max(1);

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        let batch = index + 1;
        debug!("📦 Importing batch {batch} ({} rows)", chunk.len());
        let wave = join_all(chunk.iter().map(|item| {
            let pending = save(item);
            let on_completed = &on_completed;
            async move {
                let result = pending.await;
                on_completed();
                result
            }
        }));

        let results = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, wave).await.map_err(|_| {
                warn!("Batch {batch} did not finish within {limit:?}");
                TransferError::BatchTimedOut { batch }
            })?,
            None => wave.await,
        };

        for result in results {
            let summary = result.unwrap_or_else(|e| {
                debug!("Row failed: {e:#}");
                error_result(&format!("{e:#}"))
            });
            if let Value::Object(summary) = &summary {
                sum_object(&mut total, summary);
            }
        }
    }

    Ok(Value::Object(total))
}

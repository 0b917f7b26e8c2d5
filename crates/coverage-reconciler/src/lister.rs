//! Metric Inventory Lister

use crate::deadline::with_deadline;
use monitoring_client::{BackendError, ListMetricsRequest, MetricIdentity, MonitoringBackend};
use std::time::Duration;
use tracing::{debug, error, info};

/// Result of walking the metric catalog
#[derive(Debug, Default)]
pub struct Inventory {
    /// Valid metrics in discovery order
    pub metrics: Vec<MetricIdentity>,
    /// Records dropped for missing identity fields
    pub malformed: usize,
    /// Pages fetched
    pub pages: usize,
    /// Set when listing aborted; `metrics` is then empty
    pub error: Option<BackendError>,
}

/// Walks the paginated metric catalog into one list
pub struct MetricLister<'a, B> {
    backend: &'a B,
    namespace: Option<String>,
    call_timeout: Duration,
}

impl<'a, B: MonitoringBackend> MetricLister<'a, B> {
    pub fn new(backend: &'a B, namespace: Option<String>, call_timeout: Duration) -> Self {
        Self {
            backend,
            namespace,
            call_timeout,
        }
    }

    /// List every metric in the catalog.
    ///
    /// Listing is all-or-nothing: if any page cannot be fetched the error is
    /// logged and the inventory comes back empty, with the error attached.
    pub async fn list_all_metrics(&self) -> Inventory {
        let mut inventory = Inventory::default();

        match self.walk(&mut inventory).await {
            Ok(()) => {
                info!(
                    "Discovered {} metrics across {} pages ({} malformed records skipped)",
                    inventory.metrics.len(),
                    inventory.pages,
                    inventory.malformed
                );
                inventory
            }
            Err(e) => {
                error!(
                    "Metric listing failed after {} pages, treating catalog as empty: {}",
                    inventory.pages, e
                );
                Inventory {
                    pages: inventory.pages,
                    error: Some(e),
                    ..Default::default()
                }
            }
        }
    }

    async fn walk(&self, inventory: &mut Inventory) -> Result<(), BackendError> {
        let mut next_token: Option<String> = None;

        loop {
            let requested = next_token.take();
            let request = ListMetricsRequest {
                next_token: requested.clone(),
                namespace: self.namespace.clone(),
            };
            let page = with_deadline(self.call_timeout, self.backend.list_metrics(request)).await?;
            inventory.pages += 1;

            let continuation = page.continuation().map(str::to_string);
            debug!("Fetched page {} with {} records", inventory.pages, page.records.len());

            for record in page.records {
                match record.into_identity() {
                    Ok(metric) => inventory.metrics.push(metric),
                    Err(reason) => {
                        debug!("Skipping catalog record: {}", reason);
                        inventory.malformed += 1;
                    }
                }
            }

            match continuation {
                Some(token) if requested.as_deref() == Some(token.as_str()) => {
                    return Err(BackendError::Unavailable(format!(
                        "ListMetrics returned the requested continuation token {} again",
                        token
                    )));
                }
                Some(token) => next_token = Some(token),
                None => return Ok(()),
            }
        }
    }
}

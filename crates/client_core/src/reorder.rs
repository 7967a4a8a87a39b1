//! Drag-and-drop reordering of priority-ordered admin lists.
//!
//! A move is applied to the local view first, then persisted row by row with
//! one awaited `update` per changed priority. Any failed write discards the
//! optimistic view in favour of a fresh read from the store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use shared::protocol::{Developer, ListParams, Pagination, Sort};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    error::{ClientError, ClientResult},
    notify::{Notification, NotificationSink},
    store::BackingStore,
};

pub const PRIORITY_FIELD: &str = "priority";

pub trait OrderedRecord: Clone + Send + Sync + DeserializeOwned + 'static {
    fn record_id(&self) -> i64;
    fn priority(&self) -> i64;
    fn set_priority(&mut self, priority: i64);
}

impl OrderedRecord for Developer {
    fn record_id(&self) -> i64 {
        self.id.0
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn set_priority(&mut self, priority: i64) {
        self.priority = priority;
    }
}

#[derive(Debug, Clone)]
pub struct ReorderOptions {
    /// Re-read the list after every write succeeded instead of trusting the optimistic view.
    pub confirm_with_refetch: bool,
    /// Rows per list request. Pages are fetched until the store's total is reached.
    pub page_size: u32,
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            confirm_with_refetch: false,
            page_size: 500,
        }
    }
}

#[derive(Debug)]
pub enum ReorderOutcome {
    NoOp,
    Persisted {
        updated: usize,
        confirmed: bool,
    },
    /// A write failed; the view now shows the store's contents. When the
    /// reload also failed (`refetched == false`) the pre-move list is shown.
    Reconciled {
        failure: ClientError,
        refetched: bool,
    },
}

#[derive(Debug, Clone)]
pub struct MovePlan<T> {
    pub items: Vec<T>,
    /// Indices in `items` whose priority changed, ascending.
    pub changed: Vec<usize>,
}

/// Splices `source` to `destination` and renumbers priorities densely from 0.
///
/// Returns `None` for a no-op move (fewer than two items or equal indices).
pub fn plan_move<T: OrderedRecord>(
    items: &[T],
    source: usize,
    destination: usize,
) -> ClientResult<Option<MovePlan<T>>> {
    let len = items.len();
    if len < 2 {
        return Ok(None);
    }
    if source >= len || destination >= len {
        return Err(ClientError::InvalidMove {
            source_index: source,
            destination_index: destination,
            len,
        });
    }
    if source == destination {
        return Ok(None);
    }

    let mut reordered = items.to_vec();
    let moved = reordered.remove(source);
    reordered.insert(destination, moved);

    let mut changed = Vec::new();
    for (index, item) in reordered.iter_mut().enumerate() {
        let priority = index as i64;
        if item.priority() != priority {
            item.set_priority(priority);
            changed.push(index);
        }
    }

    Ok(Some(MovePlan {
        items: reordered,
        changed,
    }))
}

/// Ascending priority, ties kept in fetch order.
pub fn sort_by_priority<T: OrderedRecord>(items: &mut [T]) {
    items.sort_by_key(|item| item.priority());
}

pub struct ReorderEngine<T: OrderedRecord> {
    store: Arc<dyn BackingStore>,
    notifier: Arc<dyn NotificationSink>,
    resource: String,
    options: ReorderOptions,
    view: watch::Sender<Vec<T>>,
    op_lock: Mutex<()>,
}

impl ReorderEngine<Developer> {
    pub fn developers(store: Arc<dyn BackingStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self::new(store, notifier, "developers")
    }
}

impl<T: OrderedRecord> ReorderEngine<T> {
    pub fn new(
        store: Arc<dyn BackingStore>,
        notifier: Arc<dyn NotificationSink>,
        resource: impl Into<String>,
    ) -> Self {
        let (view, _) = watch::channel(Vec::new());
        Self {
            store,
            notifier,
            resource: resource.into(),
            options: ReorderOptions::default(),
            view,
            op_lock: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: ReorderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn items(&self) -> Vec<T> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.view.subscribe()
    }

    /// Replaces the view with a fresh snapshot from the store.
    pub async fn load(&self) -> ClientResult<Vec<T>> {
        let _op = self.op_lock.lock().await;
        let items = self.fetch().await?;
        info!(resource = %self.resource, count = items.len(), "loaded ordered list");
        self.view.send_replace(items.clone());
        Ok(items)
    }

    /// Moves one row and persists every changed priority, one call at a time.
    ///
    /// Only an out-of-range index is returned as `Err`; persistence failures
    /// are reconciled and reported through [`ReorderOutcome::Reconciled`].
    pub async fn move_item(&self, source: usize, destination: usize) -> ClientResult<ReorderOutcome> {
        let _op = self.op_lock.lock().await;
        let snapshot = self.items();

        let Some(plan) = plan_move(&snapshot, source, destination)? else {
            debug!(resource = %self.resource, source, destination, "reorder is a no-op");
            return Ok(ReorderOutcome::NoOp);
        };

        self.view.send_replace(plan.items.clone());
        info!(
            resource = %self.resource,
            source,
            destination,
            updates = plan.changed.len(),
            "applied optimistic reorder"
        );

        for &index in &plan.changed {
            let item = &plan.items[index];
            let id = item.record_id();
            let priority = item.priority();
            let patch = json!({ "priority": priority });

            if let Err(err) = self.store.update(&self.resource, id, patch).await {
                let failure = ClientError::Conflict {
                    resource: self.resource.clone(),
                    id,
                    source: Box::new(err),
                };
                warn!(resource = %self.resource, id, priority, error = %failure, "priority update failed; reconciling");
                self.notifier.notify(Notification::error(format!(
                    "Failed to save the new order: {}",
                    failure.user_message()
                )));
                let refetched = self.reconcile(snapshot).await;
                return Ok(ReorderOutcome::Reconciled { failure, refetched });
            }
        }

        self.notifier.notify(Notification::success("Order saved"));

        let confirmed = if self.options.confirm_with_refetch {
            match self.fetch().await {
                Ok(items) => {
                    self.view.send_replace(items);
                    true
                }
                Err(err) => {
                    warn!(resource = %self.resource, error = %err, "confirmation reload failed; keeping optimistic order");
                    false
                }
            }
        } else {
            false
        };

        Ok(ReorderOutcome::Persisted {
            updated: plan.changed.len(),
            confirmed,
        })
    }

    /// Reads the whole resource. Priorities are renumbered across every row,
    /// so a partial window would collide with the rows left out.
    async fn fetch(&self) -> ClientResult<Vec<T>> {
        let per_page = self.options.page_size.max(1);
        let mut rows = Vec::new();
        let mut page = 1;
        loop {
            let params = ListParams::sorted_by(Sort::asc(PRIORITY_FIELD))
                .with_pagination(Pagination { page, per_page });
            let batch = self.store.list(&self.resource, &params).await?;
            let received = batch.data.len();
            rows.extend(batch.data);
            if received == 0 || rows.len() as u64 >= batch.total {
                break;
            }
            debug!(resource = %self.resource, page, loaded = rows.len(), total = batch.total, "fetching next page");
            page += 1;
        }

        let mut items = rows
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_priority(&mut items);
        Ok(items)
    }

    async fn reconcile(&self, last_known: Vec<T>) -> bool {
        match self.fetch().await {
            Ok(items) => {
                info!(resource = %self.resource, count = items.len(), "reloaded list after failed reorder");
                self.view.send_replace(items);
                true
            }
            Err(err) => {
                error!(resource = %self.resource, error = %err, "reload after failed reorder also failed");
                self.notifier.notify(Notification::warning(
                    "Could not reload the list; showing the last loaded order",
                ));
                self.view.send_replace(last_known);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;

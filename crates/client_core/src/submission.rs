//! Single-flight submission controller shared by the contact form and the
//! project photo uploader.
//!
//! Phases run `Idle -> Pending -> Succeeded | Failed`. A success returns to
//! `Idle` on its own after `reset_after`; a failure waits for the user to
//! retry or close. Nothing is ever retried automatically.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::error::FieldError;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    error::{ClientError, ClientResult},
    notify::{Notification, NotificationSink},
};

pub const DEFAULT_RESET_AFTER: Duration = Duration::from_millis(2000);
pub const SUBMISSION_INTERRUPTED: &str = "Submission was interrupted - please try again";

#[async_trait]
pub trait SubmissionTransport: Send + Sync + 'static {
    type Payload: Clone + Default + Send + Sync + 'static;
    type Receipt: Clone + Send + Sync + 'static;

    /// Checks run before the controller goes `Pending`; a failure costs no request.
    fn validate(&self, _payload: &Self::Payload) -> ClientResult<()> {
        Ok(())
    }

    async fn submit(&self, payload: Self::Payload) -> ClientResult<Self::Receipt>;

    fn success_message(&self, _receipt: &Self::Receipt) -> String {
        "Submitted successfully".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SubmissionState<P, R> {
    pub phase: Phase,
    pub is_open: bool,
    pub payload: P,
    pub error_message: Option<String>,
    pub field_errors: Vec<FieldError>,
    pub receipt: Option<R>,
}

impl<P: Default, R> Default for SubmissionState<P, R> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            is_open: false,
            payload: P::default(),
            error_message: None,
            field_errors: Vec::new(),
            receipt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    AlreadyPending,
    AlreadySucceeded,
}

#[derive(Debug)]
pub enum SubmitOutcome<R> {
    Rejected(RejectReason),
    Succeeded(R),
    Failed(ClientError),
}

type StateOf<T> =
    SubmissionState<<T as SubmissionTransport>::Payload, <T as SubmissionTransport>::Receipt>;

struct Slot<T: SubmissionTransport> {
    state: StateOf<T>,
    /// Bumped on every submit/open/close so a stale auto-reset timer can tell
    /// it no longer owns the state.
    generation: u64,
}

struct Shared<T: SubmissionTransport> {
    slot: Mutex<Slot<T>>,
    view: watch::Sender<StateOf<T>>,
}

impl<T: SubmissionTransport> Shared<T> {
    fn publish(&self, slot: &Slot<T>) {
        self.view.send_replace(slot.state.clone());
    }
}

pub struct SubmissionController<T: SubmissionTransport> {
    transport: Arc<T>,
    notifier: Arc<dyn NotificationSink>,
    reset_after: Duration,
    shared: Arc<Shared<T>>,
}

impl<T: SubmissionTransport> SubmissionController<T> {
    pub fn new(transport: Arc<T>, notifier: Arc<dyn NotificationSink>) -> Self {
        let (view, _) = watch::channel(SubmissionState::default());
        Self {
            transport,
            notifier,
            reset_after: DEFAULT_RESET_AFTER,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: SubmissionState::default(),
                    generation: 0,
                }),
                view,
            }),
        }
    }

    pub fn with_reset_after(mut self, reset_after: Duration) -> Self {
        self.reset_after = reset_after;
        self
    }

    pub async fn state(&self) -> StateOf<T> {
        self.shared.slot.lock().await.state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StateOf<T>> {
        self.shared.view.subscribe()
    }

    /// Resets to `Idle` with `initial` as the payload. Ignored while pending.
    pub async fn open(&self, initial: T::Payload) -> bool {
        let mut slot = self.shared.slot.lock().await;
        if slot.state.phase == Phase::Pending {
            debug!("open ignored: submission in flight");
            return false;
        }
        slot.generation += 1;
        slot.state = SubmissionState {
            is_open: true,
            payload: initial,
            ..SubmissionState::default()
        };
        self.shared.publish(&slot);
        true
    }

    /// Edits the payload in place. Ignored while pending.
    pub async fn update_payload(&self, edit: impl FnOnce(&mut T::Payload)) -> bool {
        let mut slot = self.shared.slot.lock().await;
        if slot.state.phase == Phase::Pending {
            return false;
        }
        edit(&mut slot.state.payload);
        self.shared.publish(&slot);
        true
    }

    pub async fn clear_error(&self) {
        let mut slot = self.shared.slot.lock().await;
        if slot.state.error_message.is_none() && slot.state.field_errors.is_empty() {
            return;
        }
        slot.state.error_message = None;
        slot.state.field_errors.clear();
        self.shared.publish(&slot);
    }

    /// Returns to `Idle` and clears the payload. Has no effect while pending.
    pub async fn close(&self) -> bool {
        let mut slot = self.shared.slot.lock().await;
        if slot.state.phase == Phase::Pending {
            debug!("close ignored: submission in flight");
            return false;
        }
        slot.generation += 1;
        slot.state = SubmissionState::default();
        self.shared.publish(&slot);
        true
    }

    /// Sends the current payload. At most one request is in flight per controller;
    /// a call made while one is pending is rejected, not queued.
    pub async fn submit(&self) -> SubmitOutcome<T::Receipt> {
        let (payload, generation) = {
            let mut slot = self.shared.slot.lock().await;
            match slot.state.phase {
                Phase::Pending => {
                    debug!("submit rejected: submission already in flight");
                    return SubmitOutcome::Rejected(RejectReason::AlreadyPending);
                }
                Phase::Succeeded => {
                    debug!("submit rejected: payload already delivered");
                    return SubmitOutcome::Rejected(RejectReason::AlreadySucceeded);
                }
                Phase::Idle | Phase::Failed => {}
            }

            if let Err(err) = self.transport.validate(&slot.state.payload) {
                debug!(error = %err, "submission failed local validation");
                slot.state.phase = Phase::Failed;
                slot.state.error_message = Some(err.user_message());
                slot.state.field_errors = err.field_errors().to_vec();
                slot.state.receipt = None;
                self.shared.publish(&slot);
                return SubmitOutcome::Failed(err);
            }

            slot.generation += 1;
            slot.state.phase = Phase::Pending;
            slot.state.error_message = None;
            slot.state.field_errors.clear();
            slot.state.receipt = None;
            self.shared.publish(&slot);
            (slot.state.payload.clone(), slot.generation)
        };

        info!("submission started");
        // The request runs on its own task so the phase always leaves `Pending`,
        // even when the caller stops polling this future.
        let flight = tokio::spawn(finish_submission(
            Arc::clone(&self.transport),
            Arc::clone(&self.notifier),
            Arc::clone(&self.shared),
            payload,
            generation,
            self.reset_after,
        ));

        match flight.await {
            Ok(outcome) => outcome,
            Err(join) => {
                error!(error = %join, "submission task did not finish");
                let err = ClientError::Network(format!("submission interrupted: {join}"));
                let mut slot = self.shared.slot.lock().await;
                if slot.generation == generation && slot.state.phase == Phase::Pending {
                    slot.state.phase = Phase::Failed;
                    slot.state.error_message = Some(SUBMISSION_INTERRUPTED.to_string());
                    self.shared.publish(&slot);
                }
                SubmitOutcome::Failed(err)
            }
        }
    }
}

async fn finish_submission<T: SubmissionTransport>(
    transport: Arc<T>,
    notifier: Arc<dyn NotificationSink>,
    shared: Arc<Shared<T>>,
    payload: T::Payload,
    generation: u64,
    reset_after: Duration,
) -> SubmitOutcome<T::Receipt> {
    let result = transport.submit(payload).await;

    // open/close/submit are all refused while pending, so the slot is still ours.
    let mut slot = shared.slot.lock().await;
    match result {
        Ok(receipt) => {
            info!("submission succeeded");
            slot.state.phase = Phase::Succeeded;
            slot.state.receipt = Some(receipt.clone());
            shared.publish(&slot);
            drop(slot);

            notifier.notify(Notification::success(transport.success_message(&receipt)));
            schedule_reset(shared, generation, reset_after);
            SubmitOutcome::Succeeded(receipt)
        }
        Err(err) => {
            warn!(error = %err, network = err.is_network(), "submission failed");
            let message = err.user_message();
            slot.state.phase = Phase::Failed;
            slot.state.error_message = Some(message.clone());
            slot.state.field_errors = err.field_errors().to_vec();
            shared.publish(&slot);
            drop(slot);

            notifier.notify(Notification::error(message));
            SubmitOutcome::Failed(err)
        }
    }
}

fn schedule_reset<T: SubmissionTransport>(shared: Arc<Shared<T>>, generation: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut slot = shared.slot.lock().await;
        if slot.generation != generation || slot.state.phase != Phase::Succeeded {
            return;
        }
        debug!("auto-reset after successful submission");
        slot.state = SubmissionState::default();
        shared.publish(&slot);
    });
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;

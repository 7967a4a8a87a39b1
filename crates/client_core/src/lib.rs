use std::sync::Arc;

pub mod config;
pub mod contact;
pub mod error;
pub mod notify;
pub mod photos;
pub mod public_api;
pub mod reorder;
pub mod service_requests;
pub mod store;
pub mod submission;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use contact::{ContactForm, ContactTransport};
pub use error::{ClientError, ClientResult};
pub use notify::{ChannelNotifier, Notification, NotificationLevel, NotificationSink, TracingNotifier};
pub use photos::{PhotoUploadTransport, PhotoUploader, ProjectPhotos};
pub use public_api::PublicApi;
pub use reorder::{OrderedRecord, ReorderEngine, ReorderOptions, ReorderOutcome};
pub use service_requests::ServiceRequestDesk;
pub use store::{BackingStore, HttpBackingStore};
pub use submission::{Phase, SubmissionController, SubmissionState, SubmissionTransport, SubmitOutcome};
pub use transport::ApiHttp;

use shared::protocol::Developer;

/// Wires every collaborator from one set of settings.
pub struct StudioClient {
    settings: ClientSettings,
    http: ApiHttp,
    store: Arc<dyn BackingStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl StudioClient {
    pub fn new(settings: ClientSettings, notifier: Arc<dyn NotificationSink>) -> ClientResult<Self> {
        let http = ApiHttp::new(&settings)?;
        let store: Arc<dyn BackingStore> = Arc::new(HttpBackingStore::new(http.clone()));
        Ok(Self {
            settings,
            http,
            store,
            notifier,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn BackingStore> {
        Arc::clone(&self.store)
    }

    pub fn public(&self) -> PublicApi {
        PublicApi::new(self.http.clone())
    }

    pub fn developer_ordering(&self) -> ReorderEngine<Developer> {
        ReorderEngine::developers(self.store(), Arc::clone(&self.notifier)).with_options(self.reorder_options())
    }

    pub fn ordering<T: OrderedRecord>(&self, resource: &str) -> ReorderEngine<T> {
        ReorderEngine::new(self.store(), Arc::clone(&self.notifier), resource)
            .with_options(self.reorder_options())
    }

    pub fn contact_form(&self) -> ContactForm {
        SubmissionController::new(
            Arc::new(ContactTransport::new(self.http.clone())),
            Arc::clone(&self.notifier),
        )
        .with_reset_after(self.settings.success_reset_delay())
    }

    pub fn photo_uploader(&self) -> PhotoUploader {
        SubmissionController::new(
            Arc::new(PhotoUploadTransport::new(self.http.clone())),
            Arc::clone(&self.notifier),
        )
        .with_reset_after(self.settings.success_reset_delay())
    }

    pub fn project_photos(&self) -> ProjectPhotos {
        ProjectPhotos::new(self.http.clone())
    }

    pub fn service_requests(&self) -> ServiceRequestDesk {
        ServiceRequestDesk::new(self.store(), self.http.clone())
    }

    fn reorder_options(&self) -> ReorderOptions {
        ReorderOptions {
            confirm_with_refetch: self.settings.confirm_reorder_with_refetch,
            ..ReorderOptions::default()
        }
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod http_tests;

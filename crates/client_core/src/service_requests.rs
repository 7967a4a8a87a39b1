//! Admin triage of incoming contact requests: list, inspect, update status,
//! priority, assignee and notes, and the per-status overview.

use std::sync::Arc;

use shared::{
    domain::ServiceRequestId,
    protocol::{
        ListPage, Pagination, ServiceRequest, ServiceRequestFilter, ServiceRequestStats,
        ServiceRequestUpdate,
    },
};
use tracing::info;

use crate::{
    error::{ClientError, ClientResult},
    store::BackingStore,
    transport::ApiHttp,
};

pub const SERVICE_REQUESTS: &str = "service-requests";
const STATS_PATH: &str = "admin/service-requests/stats/overview";

pub struct ServiceRequestDesk {
    store: Arc<dyn BackingStore>,
    http: ApiHttp,
}

impl ServiceRequestDesk {
    pub fn new(store: Arc<dyn BackingStore>, http: ApiHttp) -> Self {
        Self { store, http }
    }

    pub async fn list(
        &self,
        filter: &ServiceRequestFilter,
        pagination: Pagination,
    ) -> ClientResult<ListPage<ServiceRequest>> {
        let page = self
            .store
            .list(SERVICE_REQUESTS, &filter.list_params(pagination))
            .await?;
        let data = page
            .data
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ServiceRequest>, _>>()?;
        Ok(ListPage {
            data,
            total: page.total,
        })
    }

    pub async fn get(&self, id: ServiceRequestId) -> ClientResult<ServiceRequest> {
        let record = self.store.get(SERVICE_REQUESTS, id.0).await?;
        Ok(serde_json::from_value(record)?)
    }

    /// Sends only the fields set on `update`; an empty update is refused locally.
    pub async fn update(
        &self,
        id: ServiceRequestId,
        update: &ServiceRequestUpdate,
    ) -> ClientResult<ServiceRequest> {
        if update.is_empty() {
            return Err(ClientError::Validation {
                message: "Nothing to update".to_string(),
                fields: Vec::new(),
            });
        }
        let patch = serde_json::to_value(update)?;
        let record = self.store.update(SERVICE_REQUESTS, id.0, patch).await?;
        let updated: ServiceRequest = serde_json::from_value(record)?;
        info!(
            request_id = id.0,
            status = updated.status.as_str(),
            priority = updated.priority.as_str(),
            "service request triaged"
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: ServiceRequestId) -> ClientResult<()> {
        self.store.delete(SERVICE_REQUESTS, id.0).await?;
        Ok(())
    }

    pub async fn stats(&self) -> ClientResult<ServiceRequestStats> {
        self.http.get_json(STATS_PATH, &[] as &[(&str, &str)]).await
    }
}

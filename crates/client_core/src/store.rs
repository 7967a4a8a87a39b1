use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::{ListPage, ListParams};
use tracing::info;

use crate::{error::ClientResult, transport::ApiHttp};

/// Remote system of record for admin resources (`developers`, `projects`, ...).
///
/// Records travel as JSON so one implementation serves every resource; typed
/// callers decode at their own boundary.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn list(&self, resource: &str, params: &ListParams) -> ClientResult<ListPage<Value>>;
    async fn get(&self, resource: &str, id: i64) -> ClientResult<Value>;
    async fn create(&self, resource: &str, data: Value) -> ClientResult<Value>;
    /// Partial update; only the fields present in `patch` are sent.
    async fn update(&self, resource: &str, id: i64, patch: Value) -> ClientResult<Value>;
    async fn delete(&self, resource: &str, id: i64) -> ClientResult<Value>;
}

/// Admin data provider over `/admin/{resource}`.
pub struct HttpBackingStore {
    http: ApiHttp,
    prefix: String,
}

impl HttpBackingStore {
    pub fn new(http: ApiHttp) -> Self {
        Self {
            http,
            prefix: "admin".to_string(),
        }
    }

    pub fn with_prefix(http: ApiHttp, prefix: impl Into<String>) -> Self {
        Self {
            http,
            prefix: prefix.into(),
        }
    }

    fn collection_path(&self, resource: &str) -> String {
        format!("{}/{}", self.prefix.trim_matches('/'), resource)
    }

    fn record_path(&self, resource: &str, id: i64) -> String {
        format!("{}/{id}", self.collection_path(resource))
    }
}

#[async_trait]
impl BackingStore for HttpBackingStore {
    async fn list(&self, resource: &str, params: &ListParams) -> ClientResult<ListPage<Value>> {
        let page = self
            .http
            .get_page(&self.collection_path(resource), &params.query_pairs())
            .await?;
        info!(resource, rows = page.data.len(), total = page.total, "listed records");
        Ok(page)
    }

    async fn get(&self, resource: &str, id: i64) -> ClientResult<Value> {
        self.http
            .get_json(&self.record_path(resource, id), &[] as &[(&str, &str)])
            .await
    }

    async fn create(&self, resource: &str, data: Value) -> ClientResult<Value> {
        let created: Value = self
            .http
            .post_json(&self.collection_path(resource), &data)
            .await?;
        info!(resource, id = ?created.get("id"), "created record");
        Ok(created)
    }

    async fn update(&self, resource: &str, id: i64, patch: Value) -> ClientResult<Value> {
        let updated = self
            .http
            .put_json(&self.record_path(resource, id), &patch)
            .await?;
        info!(resource, id, "updated record");
        Ok(updated)
    }

    async fn delete(&self, resource: &str, id: i64) -> ClientResult<Value> {
        let deleted = self
            .http
            .delete_json(&self.record_path(resource, id), &[] as &[(&str, &str)])
            .await?;
        info!(resource, id, "deleted record");
        Ok(deleted)
    }
}

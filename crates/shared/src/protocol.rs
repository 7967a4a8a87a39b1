use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    DeveloperId, ProjectId, ProjectStatus, RequestPriority, ServiceRequestId, ServiceRequestStatus,
    TechnologyId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// 1-based page window, translated to `_start`/`_end` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 25,
        }
    }
}

impl Pagination {
    pub fn range(&self) -> (u64, u64) {
        let page = u64::from(self.page.max(1));
        let per_page = u64::from(self.per_page);
        ((page - 1) * per_page, page * per_page)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub sort: Option<Sort>,
    pub pagination: Pagination,
    pub filter: BTreeMap<String, String>,
}

impl ListParams {
    pub fn sorted_by(sort: Sort) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    /// Query pairs in the admin list format.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let (start, end) = self.pagination.range();
        let mut pairs = vec![
            ("_start".to_string(), start.to_string()),
            ("_end".to_string(), end.to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push(("_sort".to_string(), sort.field.clone()));
            pairs.push(("_order".to_string(), sort.order.as_str().to_string()));
        }
        pairs.extend(self.filter.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

#[derive(Debug, Clone)]
pub struct ListPage<T> {
    pub data: Vec<T>,
    pub total: u64,
}

/// Parses the total from a `Content-Range: items 0-24/319` header value.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    pub id: DeveloperId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub years_experience: i32,
    #[serde(default)]
    pub hourly_rate: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicDeveloper {
    pub id: DeveloperId,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub years_experience: i32,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub project_count: Option<u32>,
}

impl PublicDeveloper {
    pub fn slug(&self) -> String {
        crate::domain::slugify(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDeveloperRef {
    pub id: DeveloperId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProject {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub duration_months: Option<u32>,
    #[serde(default)]
    pub developers: Option<Vec<ProjectDeveloperRef>>,
}

impl PublicProject {
    pub fn has_developer(&self, developer_id: DeveloperId) -> bool {
        self.developers
            .as_deref()
            .is_some_and(|devs| devs.iter().any(|d| d.id == developer_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTechnology {
    pub id: TechnologyId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicStats {
    #[serde(default)]
    pub developers_count: u64,
    #[serde(default)]
    pub projects_count: u64,
    #[serde(default)]
    pub completed_requests: u64,
    #[serde(default)]
    pub projects_by_category: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub project_type: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<u32>,
}

impl ProjectFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(project_type) = &self.project_type {
            pairs.push(("project_type", project_type.clone()));
        }
        if let Some(featured) = self.featured {
            pairs.push(("featured", featured.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Contact form body posted to `/public/contact`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub client_name: String,
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub project_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactReceipt {
    pub id: i64,
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoBatch {
    pub project_id: ProjectId,
    pub files: Vec<PhotoFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUploadReceipt {
    pub message: String,
    #[serde(default)]
    pub uploaded_urls: Vec<String>,
    #[serde(default)]
    pub total_images: u64,
}

/// Reply to `DELETE /admin/projects/{id}/photos?photo_url=...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoDeleteReceipt {
    pub message: String,
    #[serde(default)]
    pub remaining_images: u64,
}

/// A contact form submission as the admin desk sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: ServiceRequestId,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    pub project_type: String,
    #[serde(default)]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<Value>,
    pub status: ServiceRequestStatus,
    #[serde(default)]
    pub priority: RequestPriority,
    #[serde(default)]
    pub developer_id: Option<DeveloperId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Partial triage update. Unset fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceRequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<RequestPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<DeveloperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ServiceRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRequestFilter {
    pub status: Option<ServiceRequestStatus>,
    pub priority: Option<RequestPriority>,
    pub project_type: Option<String>,
}

impl ServiceRequestFilter {
    /// Newest first, narrowed by whichever filters are set.
    pub fn list_params(&self, pagination: Pagination) -> ListParams {
        let mut params = ListParams::sorted_by(Sort::desc("created_at")).with_pagination(pagination);
        if let Some(status) = self.status {
            params = params.with_filter("status", status.as_str());
        }
        if let Some(priority) = self.priority {
            params = params.with_filter("priority", priority.as_str());
        }
        if let Some(project_type) = &self.project_type {
            params = params.with_filter("project_type", project_type.clone());
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequestStats {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_priority: BTreeMap<String, u64>,
}

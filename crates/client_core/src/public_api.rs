use shared::{
    domain::{slugify, DeveloperId, ProjectId},
    protocol::{ProjectFilter, PublicDeveloper, PublicProject, PublicStats, PublicTechnology},
};
use tracing::{debug, info};

use crate::{
    error::{ClientError, ClientResult},
    transport::ApiHttp,
};

const SLUG_LOOKUP_LIMIT: u32 = 50;
const DEVELOPER_PROJECTS_LIMIT: u32 = 20;
const PROJECT_FALLBACK_LIMIT: u32 = 50;

/// Read-only endpoints behind the public site pages.
#[derive(Clone)]
pub struct PublicApi {
    http: ApiHttp,
}

impl PublicApi {
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }

    pub async fn list_developers(&self, active_only: bool, limit: u32) -> ClientResult<Vec<PublicDeveloper>> {
        self.http
            .get_json(
                "public/developers",
                &[("active_only", active_only.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    pub async fn get_developer(&self, id: DeveloperId) -> ClientResult<PublicDeveloper> {
        self.http
            .get_json(&format!("public/developers/{id}"), &[] as &[(&str, &str)])
            .await
    }

    /// Profile pages are addressed by slug; the API only knows ids, so the
    /// active roster is scanned.
    pub async fn developer_by_slug(&self, slug: &str) -> ClientResult<PublicDeveloper> {
        let wanted = slugify(slug);
        self.list_developers(true, SLUG_LOOKUP_LIMIT)
            .await?
            .into_iter()
            .find(|dev| dev.slug() == wanted)
            .ok_or_else(|| ClientError::NotFound(format!("developer '{slug}'")))
    }

    /// Projects a developer worked on. Falls back to filtering the full project
    /// list when the dedicated endpoint is unavailable.
    pub async fn developer_projects(&self, id: DeveloperId) -> ClientResult<Vec<PublicProject>> {
        let direct = self
            .http
            .get_json::<Vec<PublicProject>, _>(
                &format!("public/developers/{id}/projects"),
                &[("limit", DEVELOPER_PROJECTS_LIMIT)],
            )
            .await;

        match direct {
            Ok(projects) => Ok(projects),
            Err(err) => {
                debug!(developer_id = id.0, error = %err, "developer projects endpoint failed; filtering all projects");
                let all = self
                    .list_projects(&ProjectFilter {
                        limit: Some(PROJECT_FALLBACK_LIMIT),
                        ..ProjectFilter::default()
                    })
                    .await?;
                let projects: Vec<_> = all.into_iter().filter(|p| p.has_developer(id)).collect();
                info!(developer_id = id.0, count = projects.len(), "resolved developer projects by filtering");
                Ok(projects)
            }
        }
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> ClientResult<Vec<PublicProject>> {
        self.http
            .get_json("public/projects", &filter.query_pairs())
            .await
    }

    pub async fn get_project(&self, id: ProjectId) -> ClientResult<PublicProject> {
        self.http
            .get_json(&format!("public/projects/{id}"), &[] as &[(&str, &str)])
            .await
    }

    pub async fn list_technologies(&self) -> ClientResult<Vec<PublicTechnology>> {
        self.http
            .get_json("public/technologies", &[] as &[(&str, &str)])
            .await
    }

    pub async fn stats(&self) -> ClientResult<PublicStats> {
        self.http.get_json("public/stats", &[] as &[(&str, &str)]).await
    }
}

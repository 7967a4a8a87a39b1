use super::*;
use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{DeveloperId, ProjectId, RequestPriority, ServiceRequestId, ServiceRequestStatus},
    protocol::{
        ContactRequest, ListParams, Pagination, PhotoBatch, PhotoFile, ServiceRequestFilter,
        ServiceRequestUpdate, Sort,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::error::NETWORK_ERROR_MESSAGE;

#[derive(Clone, Default)]
struct ServerState {
    log: Arc<Mutex<Vec<Value>>>,
    rows: Arc<Mutex<Vec<Value>>>,
}

impl ServerState {
    fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            ..Self::default()
        }
    }

    async fn log(&self) -> Vec<Value> {
        self.log.lock().await.clone()
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

fn client_for(base_url: String, token: Option<&str>) -> StudioClient {
    let settings = ClientSettings {
        api_base_url: base_url,
        admin_token: token.map(str::to_string),
        ..ClientSettings::default()
    };
    StudioClient::new(settings, Arc::new(TracingNotifier)).expect("client")
}

async fn list_developers(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.log.lock().await.push(json!({
        "query": query,
        "auth": bearer(&headers),
    }));
    let mut rows = state.rows.lock().await.clone();
    if query.get("_sort").map(String::as_str) == Some("priority") {
        rows.sort_by_key(|r| r["priority"].as_i64().unwrap_or_default());
    }
    let total = rows.len();
    let bound = |key: &str, default: usize| {
        query
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default)
            .min(total)
    };
    let (start, end) = (bound("_start", 0), bound("_end", total));
    let window: Vec<Value> = rows[start..end.max(start)].to_vec();
    (
        [(
            header::CONTENT_RANGE,
            format!("items {start}-{}/{total}", (start + window.len()).saturating_sub(1)),
        )],
        Json(Value::Array(window)),
    )
}

async fn update_row(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.log.lock().await.push(json!({ "id": id, "patch": patch }));
    let mut rows = state.rows.lock().await;
    let row = rows
        .iter_mut()
        .find(|r| r["id"] == json!(id))
        .ok_or(StatusCode::NOT_FOUND)?;
    if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(Json(row.clone()))
}

fn admin_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/admin/developers", get(list_developers))
        .route("/api/admin/developers/:id", put(update_row))
        .with_state(state)
}

fn dev(id: i64, priority: i64) -> Value {
    json!({
        "id": id,
        "name": format!("dev-{id}"),
        "email": format!("dev{id}@example.com"),
        "priority": priority,
    })
}

#[tokio::test]
async fn admin_list_sends_range_sort_and_token() {
    let state = ServerState::with_rows(vec![dev(1, 0), dev(2, 1), dev(3, 2)]);
    let base = spawn_server(admin_router(state.clone())).await;
    let client = client_for(base, Some("tok-123"));

    let params = ListParams::sorted_by(Sort::asc("priority")).with_pagination(Pagination {
        page: 1,
        per_page: 2,
    });
    let page = client.store().list("developers", &params).await.expect("list");

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total, 3);
    let log = state.log().await;
    assert_eq!(log[0]["auth"], json!("Bearer tok-123"));
    assert_eq!(log[0]["query"]["_start"], json!("0"));
    assert_eq!(log[0]["query"]["_end"], json!("2"));
    assert_eq!(log[0]["query"]["_sort"], json!("priority"));
    assert_eq!(log[0]["query"]["_order"], json!("ASC"));
}

#[tokio::test]
async fn developer_reorder_over_http_writes_each_row_in_turn() {
    let state = ServerState::with_rows(vec![dev(1, 0), dev(2, 1), dev(3, 2)]);
    let base = spawn_server(admin_router(state.clone())).await;
    let client = client_for(base, Some("tok"));
    let ordering = client.developer_ordering();

    ordering.load().await.expect("load");
    let outcome = ordering.move_item(2, 0).await.expect("move");

    assert!(matches!(outcome, ReorderOutcome::Persisted { updated: 3, .. }));
    let writes: Vec<(i64, Value)> = state
        .log()
        .await
        .into_iter()
        .filter_map(|entry| Some((entry.get("id")?.as_i64()?, entry["patch"].clone())))
        .collect();
    assert_eq!(
        writes,
        vec![
            (3, json!({"priority": 0})),
            (1, json!({"priority": 1})),
            (2, json!({"priority": 2})),
        ]
    );

    let reloaded = ordering.load().await.expect("reload");
    let ids: Vec<i64> = reloaded.iter().map(|d| d.id.0).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn missing_row_during_reorder_reconciles_from_server() {
    let state = ServerState::with_rows(vec![dev(1, 0), dev(2, 1), dev(3, 2)]);
    let base = spawn_server(admin_router(state.clone())).await;
    let client = client_for(base, None);
    let ordering = client.developer_ordering();
    ordering.load().await.expect("load");

    // Row 1 is deleted by someone else before the reorder is saved.
    state.rows.lock().await.retain(|r| r["id"] != json!(1));
    let outcome = ordering.move_item(2, 0).await.expect("move");

    match outcome {
        ReorderOutcome::Reconciled { failure, refetched } => {
            assert!(refetched);
            assert_eq!(failure.status(), Some(404));
        }
        other => panic!("expected reconciliation, got {other:?}"),
    }
    let ids: Vec<i64> = ordering.items().iter().map(|d| d.id.0).collect();
    assert_eq!(ids, vec![3, 2]);
}

async fn accept_contact(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.log.lock().await.push(body);
    Json(json!({
        "id": 41,
        "message": "Thank you for your request! We'll get back to you soon.",
        "status": "submitted"
    }))
}

async fn reject_contact() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "detail": [{"loc": ["body", "client_email"], "msg": "value is not a valid email address", "type": "value_error"}],
            "message": "Validation failed - check server logs for details"
        })),
    )
}

fn contact_request() -> ContactRequest {
    ContactRequest {
        client_name: "Ada Lovelace".into(),
        client_email: "ada@example.com".into(),
        project_type: "web".into(),
        budget_range: Some("5k-10k".into()),
        description: "Online store for handmade goods".into(),
        ..ContactRequest::default()
    }
}

#[tokio::test]
async fn contact_form_posts_json_and_stores_the_receipt() {
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/public/contact", post(accept_contact))
        .with_state(state.clone());
    let client = client_for(spawn_server(app).await, None);
    let form = client.contact_form();
    form.open(contact_request()).await;

    let outcome = form.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Succeeded(ref r) if r.id == 41));
    let sent = state.log().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["client_email"], json!("ada@example.com"));
    assert_eq!(sent[0]["budget_range"], json!("5k-10k"));
    assert!(sent[0].get("client_phone").is_none());
    let current = form.state().await;
    assert_eq!(current.phase, Phase::Succeeded);
    assert_eq!(current.receipt.map(|r| r.status), Some("submitted".to_string()));
}

#[tokio::test]
async fn contact_form_surfaces_server_validation() {
    let app = Router::new().route("/api/public/contact", post(reject_contact));
    let client = client_for(spawn_server(app).await, None);
    let form = client.contact_form();
    form.open(contact_request()).await;

    form.submit().await;

    let current = form.state().await;
    assert_eq!(current.phase, Phase::Failed);
    assert_eq!(
        current.error_message.as_deref(),
        Some("Validation failed - check server logs for details")
    );
    assert_eq!(current.field_errors[0].field, "client_email");
}

#[tokio::test]
async fn unreachable_api_fails_with_connection_hint() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let client = client_for(format!("http://{addr}/api"), None);
    let form = client.contact_form();
    form.open(contact_request()).await;

    let outcome = form.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(ref e) if e.is_network()));
    let current = form.state().await;
    assert_eq!(current.phase, Phase::Failed);
    assert_eq!(current.error_message.as_deref(), Some(NETWORK_ERROR_MESSAGE));
}

async fn receive_photos(
    State(state): State<ServerState>,
    Path(project_id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut names = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("field") {
        let part = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("bytes");
        state.log.lock().await.push(json!({
            "part": part,
            "file_name": file_name,
            "content_type": content_type,
            "len": bytes.len(),
        }));
        names.push(format!("https://cdn.example.com/{project_id}/{}", file_name.unwrap_or_default()));
    }
    state.log.lock().await.push(json!({ "auth": bearer(&headers) }));
    Json(json!({
        "message": format!("Uploaded {} photos", names.len()),
        "uploaded_urls": names,
        "total_images": 5
    }))
}

#[tokio::test]
async fn photo_uploader_sends_one_part_per_file() {
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/admin/projects/:id/photos", post(receive_photos))
        .with_state(state.clone());
    let client = client_for(spawn_server(app).await, Some("admin-token"));
    let uploader = client.photo_uploader();
    uploader
        .open(PhotoBatch {
            project_id: ProjectId(9),
            files: vec![
                PhotoFile {
                    filename: "home.png".into(),
                    mime_type: Some("image/png".into()),
                    bytes: vec![1, 2, 3],
                },
                PhotoFile {
                    filename: "cart.jpg".into(),
                    mime_type: None,
                    bytes: vec![4, 5],
                },
            ],
        })
        .await;

    let outcome = uploader.submit().await;

    let receipt = match outcome {
        SubmitOutcome::Succeeded(receipt) => receipt,
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(receipt.message, "Uploaded 2 photos");
    assert_eq!(receipt.total_images, 5);
    let log = state.log().await;
    assert_eq!(log[0]["part"], json!("photos"));
    assert_eq!(log[0]["file_name"], json!("home.png"));
    assert_eq!(log[0]["content_type"], json!("image/png"));
    assert_eq!(log[0]["len"], json!(3));
    assert_eq!(log[1]["file_name"], json!("cart.jpg"));
    assert_eq!(log[1]["content_type"], json!("application/octet-stream"));
    assert_eq!(log[2]["auth"], json!("Bearer admin-token"));
}

#[tokio::test]
async fn empty_photo_batch_never_reaches_the_server() {
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/admin/projects/:id/photos", post(receive_photos))
        .with_state(state.clone());
    let client = client_for(spawn_server(app).await, None);
    let uploader = client.photo_uploader();
    uploader
        .open(PhotoBatch {
            project_id: ProjectId(9),
            files: Vec::new(),
        })
        .await;

    let outcome = uploader.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(ClientError::Validation { .. })));
    assert!(state.log().await.is_empty());
}

async fn public_developers() -> Json<Value> {
    Json(json!([
        {"id": 1, "name": "Ada Lovelace", "years_experience": 9, "specialization": "Backend"},
        {"id": 2, "name": "Grace  Hopper", "years_experience": 12, "specialization": "Compilers"}
    ]))
}

async fn developer_projects_unavailable() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn public_projects(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(query.get("limit").map(String::as_str), Some("50"));
    Json(json!([
        {"id": 10, "title": "Shop", "developers": [{"id": 2, "name": "Grace Hopper"}]},
        {"id": 11, "title": "Blog", "developers": [{"id": 1, "name": "Ada Lovelace"}]},
        {"id": 12, "title": "CRM"}
    ]))
}

fn public_router() -> Router {
    Router::new()
        .route("/api/public/developers", get(public_developers))
        .route(
            "/api/public/developers/:id/projects",
            get(developer_projects_unavailable),
        )
        .route("/api/public/projects", get(public_projects))
}

#[tokio::test]
async fn developer_lookup_by_slug() {
    let client = client_for(spawn_server(public_router()).await, None);
    let public = client.public();

    let grace = public.developer_by_slug("grace-hopper").await.expect("found");
    assert_eq!(grace.id, DeveloperId(2));

    let missing = public.developer_by_slug("alan-turing").await.expect_err("missing");
    assert!(matches!(missing, ClientError::NotFound(_)));
}

#[tokio::test]
async fn developer_projects_fall_back_to_filtering() {
    let client = client_for(spawn_server(public_router()).await, None);

    let projects = client
        .public()
        .developer_projects(DeveloperId(2))
        .await
        .expect("projects");

    let ids: Vec<ProjectId> = projects.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![ProjectId(10)]);
}

async fn remove_photo(
    State(state): State<ServerState>,
    Path(project_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let url = query.get("photo_url").cloned().unwrap_or_default();
    let mut photos = state.rows.lock().await;
    let before = photos.len();
    photos.retain(|p| p != &json!(url));
    if photos.len() == before {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Photo not found in project"})),
        ));
    }
    state
        .log
        .lock()
        .await
        .push(json!({ "project_id": project_id, "photo_url": url }));
    Ok(Json(json!({
        "message": "Photo deleted successfully",
        "remaining_images": photos.len()
    })))
}

#[tokio::test]
async fn deleting_a_photo_sends_its_url_as_a_query() {
    let doomed = "https://cdn.example.com/9/home page.png";
    let state = ServerState::with_rows(vec![json!(doomed), json!("https://cdn.example.com/9/cart.jpg")]);
    let app = Router::new()
        .route("/api/admin/projects/:id/photos", delete(remove_photo))
        .with_state(state.clone());
    let client = client_for(spawn_server(app).await, Some("admin-token"));
    let photos = client.project_photos();

    let receipt = photos.delete(ProjectId(9), doomed).await.expect("delete");

    assert_eq!(receipt.message, "Photo deleted successfully");
    assert_eq!(receipt.remaining_images, 1);
    assert_eq!(
        state.log().await,
        vec![json!({ "project_id": 9, "photo_url": doomed })]
    );

    let again = photos.delete(ProjectId(9), doomed).await.expect_err("already gone");
    assert_eq!(again.status(), Some(404));
    assert_eq!(again.user_message(), "Photo not found in project");
}

fn service_request(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "client_name": format!("client-{id}"),
        "client_email": format!("client{id}@example.com"),
        "project_type": "web",
        "description": "Online store",
        "requirements": {},
        "status": status,
        "priority": "medium",
        "developer_id": null,
        "notes": null,
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:00"
    })
}

async fn list_requests(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.log.lock().await.push(json!({ "query": query }));
    let rows: Vec<Value> = state
        .rows
        .lock()
        .await
        .iter()
        .filter(|r| query.get("status").map_or(true, |s| r["status"] == json!(s)))
        .cloned()
        .collect();
    let total = rows.len();
    let start: usize = query.get("_start").and_then(|v| v.parse().ok()).unwrap_or(0);
    let end: usize = query.get("_end").and_then(|v| v.parse().ok()).unwrap_or(total);
    let window: Vec<Value> = rows.into_iter().skip(start).take(end.saturating_sub(start)).collect();
    ([("x-total-count", total.to_string())], Json(Value::Array(window)))
}

async fn request_stats() -> Json<Value> {
    Json(json!({
        "total_requests": 3,
        "by_status": {"new": 2, "in_progress": 1},
        "by_priority": {"medium": 3}
    }))
}

#[tokio::test]
async fn service_request_desk_filters_triages_and_summarises() {
    let state = ServerState::with_rows(vec![
        service_request(5, "new"),
        service_request(6, "in_progress"),
        service_request(7, "new"),
    ]);
    let app = Router::new()
        .route("/api/admin/service-requests", get(list_requests))
        .route("/api/admin/service-requests/stats/overview", get(request_stats))
        .route("/api/admin/service-requests/:id", put(update_row))
        .with_state(state.clone());
    let client = client_for(spawn_server(app).await, Some("tok"));
    let desk = client.service_requests();

    let filter = ServiceRequestFilter {
        status: Some(ServiceRequestStatus::New),
        ..ServiceRequestFilter::default()
    };
    let page = desk
        .list(&filter, Pagination { page: 1, per_page: 1 })
        .await
        .expect("list");
    assert_eq!(page.total, 2);
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, ServiceRequestId(5));

    let updated = desk
        .update(
            ServiceRequestId(5),
            &ServiceRequestUpdate {
                status: Some(ServiceRequestStatus::Contacted),
                priority: Some(RequestPriority::High),
                developer_id: Some(DeveloperId(2)),
                notes: None,
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.status, ServiceRequestStatus::Contacted);
    assert_eq!(updated.priority, RequestPriority::High);
    assert_eq!(updated.developer_id, Some(DeveloperId(2)));

    let log = state.log().await;
    assert_eq!(log[0]["query"]["_sort"], json!("created_at"));
    assert_eq!(log[0]["query"]["_order"], json!("DESC"));
    assert_eq!(log[0]["query"]["status"], json!("new"));
    assert_eq!(
        log[1],
        json!({
            "id": 5,
            "patch": {"status": "contacted", "priority": "high", "developer_id": 2}
        })
    );

    let nothing = desk
        .update(ServiceRequestId(5), &ServiceRequestUpdate::default())
        .await
        .expect_err("empty update");
    assert!(matches!(nothing, ClientError::Validation { .. }));
    assert_eq!(state.log().await.len(), 2);

    let stats = desk.stats().await.expect("stats");
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.by_status.get("new"), Some(&2));
}

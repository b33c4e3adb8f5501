//! HTTP surface: request actions, visibility-filtered listing, chain
//! inspection, and the WhatsApp webhook. The acting user is taken from the
//! `X-User-Id` header; validating it is the upstream gateway's concern.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use wapprove_core::domain::approval_log::ApprovalLog;
use wapprove_core::domain::department::DepartmentId;
use wapprove_core::domain::request::{
    DraftUpdate, NewRequest, NewRequestItem, Request, RequestId, RequestItem, RequestStatus,
    UrgencyLevel,
};
use wapprove_core::domain::user::UserId;
use wapprove_core::workflow::chain::ApprovalLayer;
use wapprove_db::repositories::{
    ListMeta, Page, RequestListFilter, RequestSortBy, SortOrder, SqlUserRepository,
    UserRepository,
};
use wapprove_db::DbPool;
use wapprove_engine::{ApprovalWorkflow, ServiceError};
use wapprove_whatsapp::twilio::{self, TwilioClient};
use wapprove_whatsapp::webhook::{TwilioWebhookPayload, WebhookDispatcher};

use crate::bootstrap::Application;
use crate::channel::WorkflowCommandService;
use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub workflow: Arc<ApprovalWorkflow>,
    pub dispatcher: Arc<WebhookDispatcher<WorkflowCommandService>>,
    pub twilio: Option<Arc<TwilioClient>>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn from_application(app: &Application) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlUserRepository::new(app.db_pool.clone()));
        let dispatcher = Arc::new(WebhookDispatcher::new(WorkflowCommandService::new(
            app.workflow.clone(),
            users,
        )));
        Self {
            db_pool: app.db_pool.clone(),
            workflow: app.workflow.clone(),
            dispatcher,
            twilio: app.twilio.clone(),
            webhook_secret: app.config.whatsapp.webhook_secret.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/requests", post(create_request).get(list_requests))
        .route(
            "/requests/{id}",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/requests/{id}/submit", post(submit_request))
        .route("/requests/{id}/approve", post(approve_request))
        .route("/requests/{id}/reject", post(reject_request))
        .route("/requests/{id}/cancel", post(cancel_request))
        .route("/requests/{id}/hold", post(hold_request))
        .route("/requests/{id}/process", post(process_request))
        .route("/requests/{id}/complete", post(complete_request))
        .route("/departments/{id}/chain", get(get_chain))
        .route("/webhooks/whatsapp", post(whatsapp_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Clone, Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, kind: "bad_request", message: message.into() }
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, kind: "unauthorized", message: message.into() }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self { status: StatusCode::FORBIDDEN, kind: "forbidden", message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.kind, "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match &error {
            ServiceError::Workflow(workflow) => {
                let status = match workflow.kind() {
                    "not_found" => StatusCode::NOT_FOUND,
                    "permission_denied" => StatusCode::FORBIDDEN,
                    _ => StatusCode::CONFLICT,
                };
                Self { status, kind: workflow.kind(), message: workflow.to_string() }
            }
            ServiceError::Persistence(detail) => {
                warn!(
                    event_name = "api.persistence_failure",
                    error = %detail,
                    "storage failure surfaced to the API"
                );
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    kind: "internal",
                    message: "internal storage failure".to_string(),
                }
            }
        }
    }
}

fn actor_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .map(UserId)
        .ok_or_else(|| ApiError::unauthorized("missing or invalid X-User-Id header"))
}

#[derive(Debug, Serialize)]
struct RequestDetail {
    #[serde(flatten)]
    request: Request,
    items: Vec<RequestItem>,
    approval_logs: Vec<ApprovalLog>,
}

async fn request_detail(state: &AppState, request: Request) -> Result<RequestDetail, ApiError> {
    let items = state.workflow.items(request.id).await?;
    let approval_logs = state.workflow.decision_trail(request.id).await?;
    Ok(RequestDetail { request, items, approval_logs })
}

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    department_id: i64,
    description: String,
    status_note: Option<String>,
    urgency_level: Option<UrgencyLevel>,
    request_date: NaiveDate,
    #[serde(default)]
    draft: bool,
    items: Vec<NewRequestItem>,
}

async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<RequestDetail>), ApiError> {
    let actor = actor_id(&headers)?;
    if body.items.is_empty() {
        return Err(ApiError::bad_request("a request needs at least one item"));
    }

    let request = state
        .workflow
        .create(NewRequest {
            user_id: actor,
            department_id: DepartmentId(body.department_id),
            description: body.description,
            status_note: body.status_note,
            urgency_level: body.urgency_level.unwrap_or_default(),
            request_date: body.request_date,
            draft: body.draft,
            items: body.items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(request_detail(&state, request).await?)))
}

#[derive(Debug, Default, Deserialize)]
struct ActionBody {
    notes: Option<String>,
}

async fn submit_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let request = state.workflow.submit(RequestId(id), actor).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<ActionBody>>,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let notes = body.and_then(|Json(body)| body.notes);
    let request = state.workflow.approve(RequestId(id), actor, notes).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<ActionBody>>,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let notes = body.and_then(|Json(body)| body.notes);
    let request = state.workflow.reject(RequestId(id), actor, notes).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let request = state.workflow.cancel(RequestId(id), actor).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn hold_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<ActionBody>>,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let notes = body.and_then(|Json(body)| body.notes);
    let request = state.workflow.hold(RequestId(id), actor, notes).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn process_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let request = state.workflow.process(RequestId(id), actor).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn complete_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let request = state.workflow.complete(RequestId(id), actor).await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    let request = state.workflow.get(RequestId(id), actor).await?;
    Ok(Json(request_detail(&state, request).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateRequestBody {
    description: Option<String>,
    status_note: Option<String>,
    urgency_level: Option<UrgencyLevel>,
    request_date: Option<NaiveDate>,
    items: Option<Vec<NewRequestItem>>,
}

async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<UpdateRequestBody>,
) -> Result<Json<RequestDetail>, ApiError> {
    let actor = actor_id(&headers)?;
    if body.items.as_ref().is_some_and(Vec::is_empty) {
        return Err(ApiError::bad_request("a request needs at least one item"));
    }

    let request = state
        .workflow
        .update_draft(
            RequestId(id),
            actor,
            DraftUpdate {
                description: body.description,
                status_note: body.status_note,
                urgency_level: body.urgency_level,
                request_date: body.request_date,
                items: body.items,
            },
        )
        .await?;
    Ok(Json(request_detail(&state, request).await?))
}

async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = actor_id(&headers)?;
    state.workflow.delete_draft(RequestId(id), actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
    department_id: Option<i64>,
    user_id: Option<i64>,
    urgency_level: Option<String>,
    current_approval_level: Option<i64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    query: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    data: Vec<Request>,
    meta: ListMeta,
}

async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let actor = actor_id(&headers)?;

    let status = params
        .status
        .as_deref()
        .map(|value| {
            RequestStatus::parse(value)
                .ok_or_else(|| ApiError::bad_request(format!("unknown status `{value}`")))
        })
        .transpose()?;
    let urgency_level = params
        .urgency_level
        .as_deref()
        .map(|value| {
            UrgencyLevel::parse(value)
                .ok_or_else(|| ApiError::bad_request(format!("unknown urgency level `{value}`")))
        })
        .transpose()?;
    let sort_by = match params.sort_by.as_deref() {
        None | Some("created_at") => RequestSortBy::CreatedAt,
        Some("request_date") => RequestSortBy::RequestDate,
        Some("total_amount") => RequestSortBy::TotalAmount,
        Some("request_code") => RequestSortBy::RequestCode,
        Some(other) => {
            return Err(ApiError::bad_request(format!("unsupported sort field `{other}`")))
        }
    };
    let sort_order = match params.sort_order.as_deref() {
        None | Some("desc") => SortOrder::Desc,
        Some("asc") => SortOrder::Asc,
        Some(other) => {
            return Err(ApiError::bad_request(format!("unsupported sort order `{other}`")))
        }
    };

    let filter = RequestListFilter {
        status,
        department_id: params.department_id.map(DepartmentId),
        user_id: params.user_id.map(UserId),
        urgency_level,
        current_approval_level: params.current_approval_level,
        start_date: params.start_date,
        end_date: params.end_date,
        query: params.query,
        sort_by,
        sort_order,
    };
    let page = Page {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(10).min(100),
    };

    let (data, meta) = state.workflow.list(actor, filter, page).await?;
    Ok(Json(ListResponse { data, meta }))
}

async fn get_chain(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ApprovalLayer>>, ApiError> {
    let layers = state.workflow.chain(DepartmentId(id)).await?;
    Ok(Json(layers))
}

/// Twilio posts both incoming messages and delivery callbacks here. The
/// raw body is needed for signature validation, so the form is decoded
/// manually afterwards.
async fn whatsapp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("x-twilio-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !twilio::validate_signature(state.webhook_secret.as_deref(), signature, &body) {
        return Err(ApiError::forbidden("invalid webhook signature"));
    }

    let payload: TwilioWebhookPayload = serde_urlencoded::from_str(&body)
        .map_err(|error| ApiError::bad_request(format!("malformed webhook payload: {error}")))?;

    if payload.is_status_callback() {
        let message_status = payload.message_status.as_deref().unwrap_or_default();
        state.workflow.delivery_callback(&payload.message_sid, message_status).await?;
        return Ok(StatusCode::OK);
    }

    let reply = state.dispatcher.handle_incoming(&payload).await;
    match &state.twilio {
        Some(client) => {
            // Best effort; the inbound action already committed.
            let outcome = client.send_message(payload.sender_phone(), &reply).await;
            if !outcome.success {
                warn!(
                    event_name = "whatsapp.webhook.reply_failed",
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "could not deliver webhook reply"
                );
            }
        }
        None => {
            debug!(
                event_name = "whatsapp.webhook.reply_skipped",
                reply, "no channel configured; webhook reply not delivered"
            );
        }
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use wapprove_core::domain::approver::{ApproverType, NewApprover};
    use wapprove_core::domain::department::{DepartmentId, NewDepartment};
    use wapprove_core::domain::user::{NewUser, UserId, UserRole};
    use wapprove_db::repositories::{
        ApproverRepository, DepartmentRepository, SqlApproverRepository,
        SqlDepartmentRepository, SqlUserRepository, UserRepository,
    };
    use wapprove_db::{connect_with_settings, migrations, DbPool};
    use wapprove_engine::{ApprovalWorkflow, NoopNotifier};
    use wapprove_whatsapp::webhook::WebhookDispatcher;

    use super::{router, AppState};
    use crate::channel::WorkflowCommandService;

    async fn test_state() -> AppState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        state_over(pool, None)
    }

    fn state_over(pool: DbPool, webhook_secret: Option<String>) -> AppState {
        let workflow =
            Arc::new(ApprovalWorkflow::from_pool(pool.clone(), Arc::new(NoopNotifier)));
        let users: Arc<dyn wapprove_db::repositories::UserRepository> =
            Arc::new(SqlUserRepository::new(pool.clone()));
        let dispatcher = Arc::new(WebhookDispatcher::new(WorkflowCommandService::new(
            workflow.clone(),
            users,
        )));
        AppState { db_pool: pool, workflow, dispatcher, twilio: None, webhook_secret }
    }

    async fn seed_user(
        state: &AppState,
        email: &str,
        role: UserRole,
        department_id: Option<DepartmentId>,
        phone_number: Option<&str>,
    ) -> UserId {
        SqlUserRepository::new(state.db_pool.clone())
            .insert(NewUser {
                role,
                name: email.to_string(),
                email: email.to_string(),
                phone_number: phone_number.map(ToOwned::to_owned),
                department_id,
            })
            .await
            .expect("insert user")
            .id
    }

    async fn seed_department(state: &AppState, code: &str) -> DepartmentId {
        SqlDepartmentRepository::new(state.db_pool.clone())
            .insert(NewDepartment {
                name: code.to_string(),
                code: code.to_string(),
                approval_layers: None,
            })
            .await
            .expect("insert department")
            .id
    }

    fn create_body(department_id: DepartmentId) -> String {
        json!({
            "department_id": department_id.0,
            "description": "office chairs",
            "request_date": "2026-08-06",
            "items": [{
                "item_name": "chair",
                "quantity": 4,
                "unit_price": "250000",
                "total_price": "1000000",
                "category": "furniture"
            }]
        })
        .to_string()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ready_with_a_live_database() {
        let state = test_state().await;

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = response_json(response).await;
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["database"]["status"], "ready");
    }

    #[tokio::test]
    async fn create_and_approve_over_http() {
        let state = test_state().await;
        let department = seed_department(&state, "GA").await;
        let staff = seed_user(&state, "staff@example.com", UserRole::Staff, None, None).await;
        let admin = seed_user(&state, "admin@example.com", UserRole::Admin, None, None).await;

        let response = router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/requests")
                    .header("content-type", "application/json")
                    .header("x-user-id", staff.0.to_string())
                    .body(Body::from(create_body(department)))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = response_json(response).await;
        assert_eq!(created["status"], "PENDING_PURCHASING_APPROVAL");
        assert_eq!(created["current_approval_level"], 1);
        let request_id = created["id"].as_i64().expect("request id");

        let response = router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/requests/{request_id}/approve"))
                    .header("content-type", "application/json")
                    .header("x-user-id", admin.0.to_string())
                    .body(Body::from(json!({ "notes": "go ahead" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let approved = response_json(response).await;
        assert_eq!(approved["status"], "FULLY_APPROVED");
        assert_eq!(approved["approval_logs"].as_array().expect("logs").len(), 1);

        // Staff approval attempts surface the denial reason.
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/requests/{request_id}/approve"))
                    .header("x-user-id", staff.0.to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let denied = response_json(response).await;
        assert_eq!(denied["error"], "permission_denied");
    }

    #[tokio::test]
    async fn missing_actor_header_is_unauthorized() {
        let state = test_state().await;
        let department = seed_department(&state, "GA").await;

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/requests")
                    .header("content-type", "application/json")
                    .body(Body::from(create_body(department)))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_rejects_a_bad_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let state = state_over(pool, Some("webhook-secret".to_string()));

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/webhooks/whatsapp")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("x-twilio-signature", "bogus")
                    .body(Body::from("MessageSid=SM1&From=whatsapp%3A%2B62811&Body=hi"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_command_drives_the_workflow() {
        let state = test_state().await;
        let department = seed_department(&state, "FIN").await;
        let staff =
            seed_user(&state, "staff@example.com", UserRole::Staff, Some(department), None).await;
        let manager = seed_user(
            &state,
            "manager@example.com",
            UserRole::Manager,
            Some(department),
            Some("+628110000004"),
        )
        .await;
        SqlApproverRepository::new(state.db_pool.clone())
            .insert(NewApprover {
                user_id: manager,
                department_id: department,
                approver_type: ApproverType::Manager,
                approval_level: 1,
            })
            .await
            .expect("insert approver");

        let response = router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/requests")
                    .header("content-type", "application/json")
                    .header("x-user-id", staff.0.to_string())
                    .body(Body::from(create_body(department)))
                    .expect("request"),
            )
            .await
            .expect("response");
        let created = response_json(response).await;
        let request_id = created["id"].as_i64().expect("request id");
        let request_code = created["request_code"].as_str().expect("code").to_string();

        let form = serde_urlencoded::to_string([
            ("MessageSid", "SM1".to_string()),
            ("From", "whatsapp:+628110000004".to_string()),
            ("Body", format!("APPROVE {request_code}")),
        ])
        .expect("encode form");
        let response = router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/webhooks/whatsapp")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/requests/{request_id}"))
                    .header("x-user-id", staff.0.to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let reloaded = response_json(response).await;
        assert_eq!(reloaded["status"], "PENDING_PURCHASING_APPROVAL");
        assert_eq!(reloaded["current_approval_level"], 2);
    }

    #[tokio::test]
    async fn chain_endpoint_lists_configured_layers() {
        let state = test_state().await;
        let department = seed_department(&state, "FIN").await;
        let manager =
            seed_user(&state, "manager@example.com", UserRole::Manager, Some(department), None)
                .await;
        SqlApproverRepository::new(state.db_pool.clone())
            .insert(NewApprover {
                user_id: manager,
                department_id: department,
                approver_type: ApproverType::Manager,
                approval_level: 1,
            })
            .await
            .expect("insert approver");

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/departments/{}/chain", department.0))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let layers = response_json(response).await;
        assert_eq!(layers[0]["approval_level"], 1);
        assert_eq!(layers[0]["approver_type"], "MANAGER");
    }
}

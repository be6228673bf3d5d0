use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, State},
    http::{request::Parts, HeaderMap, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use exportdesk_core::{
    Actor, CoreError, CreateRfq, DashboardStats, Marketplace, NewProfile, ProductDraft,
    ProductFilter, RfqFilter, RfqSummary,
};
use exportdesk_shared::constants::ACTOR_HEADER;
use exportdesk_shared::{ProductId, RfqId, RfqStatus, SenderType, UserId};
use exportdesk_store::{Message, Product, Profile, ProfileUpdate, PurgeReport, Rfq};

use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/profiles", post(register_profile))
        .route("/profiles/me", get(get_own_profile).put(update_own_profile))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:key",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/rfqs", get(list_rfqs).post(create_rfq))
        .route("/rfqs/:id", get(get_rfq))
        .route("/rfqs/:id/status", put(update_rfq_status))
        .route("/rfqs/:id/messages", get(list_messages).post(post_message))
        .route("/rfqs/:id/messages/stream", get(stream_messages))
        .route("/admin/rfqs", get(admin_rfq_summaries))
        .route("/admin/users", get(admin_list_users))
        .route("/admin/users/:id", delete(admin_purge_user))
        .route("/admin/users/:id/active", put(admin_set_active))
        .route("/admin/stats", get(admin_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Actor extraction ───

fn header_user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ApiError::Unauthenticated)
}

/// The caller, resolved from the gateway-authenticated user id header.  The
/// role always comes from the stored profile.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = header_user_id(&parts.headers)?;
        let actor = state.market.identity().resolve(user_id).await?;
        Ok(CurrentActor(actor))
    }
}

// ─── Extractors with JSON rejections ───

/// `axum::Json` whose rejections go through [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct ApiPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct ApiQuery<T>(T);

// ─── Request / response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: String,
}

#[derive(Deserialize)]
struct RfqListParams {
    status: Option<String>,
    owner: Option<UserId>,
    search: Option<String>,
}

impl RfqListParams {
    fn into_filter(self) -> Result<RfqFilter, ApiError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<RfqStatus>().map_err(CoreError::from)?),
            None => None,
        };
        Ok(RfqFilter {
            status,
            owner: self.owner,
            search: self.search,
        })
    }
}

#[derive(Deserialize)]
struct StatusUpdateRequest {
    status: String,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Deserialize)]
struct PostMessageRequest {
    text: String,
    /// Defaults to the caller's role.  Claiming the other role is refused.
    #[serde(default)]
    sender_type: Option<SenderType>,
}

#[derive(Deserialize)]
struct SetActiveRequest {
    active: bool,
}

// ─── Handlers ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: format!("{:?}", state.config.store_backend).to_lowercase(),
    })
}

/// Create the caller's own buyer profile after sign-up.
async fn register_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(new): ApiJson<NewProfile>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let user_id = header_user_id(&headers)?;
    if new.user_id != user_id {
        warn!(header = %user_id, body = %new.user_id, "profile registration for another user refused");
        return Err(CoreError::Authorization.into());
    }
    let profile = state.market.identity().register(new).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_own_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.market.identity().profile(&actor).await?))
}

/// Edit the caller's own contact details.  Role, code and active flag are
/// not part of the body and unknown fields are ignored.
async fn update_own_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.market.identity().update_profile(&actor, update).await?))
}

async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.market.catalog().list(&filter).await?))
}

async fn get_product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.market.catalog().get_by_slug(&slug).await?))
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid product id: {e}")))
}

async fn create_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.market.catalog().create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(key): ApiPath<String>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_product_id(&key)?;
    Ok(Json(state.market.catalog().update(&actor, id, draft).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(key): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_product_id(&key)?;
    state.market.catalog().delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_rfqs(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(params): ApiQuery<RfqListParams>,
) -> Result<Json<Vec<Rfq>>, ApiError> {
    let filter = params.into_filter()?;
    Ok(Json(state.market.rfqs().list(&actor, &filter).await?))
}

async fn create_rfq(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(req): ApiJson<CreateRfq>,
) -> Result<(StatusCode, Json<Rfq>), ApiError> {
    let rfq = state.market.rfqs().create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(rfq)))
}

async fn get_rfq(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RfqId>,
) -> Result<Json<Rfq>, ApiError> {
    Ok(Json(state.market.rfqs().get(&actor, id).await?))
}

async fn update_rfq_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RfqId>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Rfq>, ApiError> {
    let rfq = state
        .market
        .rfqs()
        .update_status_from_wire(&actor, id, &req.status, req.expected_version)
        .await?;
    Ok(Json(rfq))
}

async fn list_messages(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RfqId>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.market.threads().list_by_rfq(&actor, id).await?))
}

async fn post_message(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RfqId>,
    ApiJson(req): ApiJson<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let sender_type = req
        .sender_type
        .unwrap_or_else(|| SenderType::from(actor.role));
    let message = state
        .market
        .threads()
        .append(&actor, sender_type, id, &req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Server-sent events carrying the whole thread snapshot, once on connect and
/// again after every change.  The view closes when the client goes away.
async fn stream_messages(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<RfqId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let view = state.market.sync().open(actor, id).await?;
    let rx = view.watch();
    info!(rfq_id = %id, actor = %actor.id, "thread stream opened");

    let events = stream::unfold((view, rx, true), |(view, mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("thread")
            .json_data(&snapshot)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to encode thread snapshot");
                Event::default().event("error").data("encoding failed")
            });
        Some((Ok::<_, Infallible>(event), (view, rx, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn admin_rfq_summaries(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(params): ApiQuery<RfqListParams>,
) -> Result<Json<Vec<RfqSummary>>, ApiError> {
    let filter = params.into_filter()?;
    Ok(Json(state.market.rfqs().list_summaries(&actor, &filter).await?))
}

async fn admin_list_users(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.market.admin().list_users(&actor).await?))
}

async fn admin_set_active(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<SetActiveRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .market
        .admin()
        .set_user_active(&actor, id, req.active)
        .await?;
    Ok(Json(profile))
}

async fn admin_purge_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<PurgeReport>, ApiError> {
    Ok(Json(state.market.admin().purge_user(&actor, id).await?))
}

async fn admin_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.market.admin().stats(&actor).await?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

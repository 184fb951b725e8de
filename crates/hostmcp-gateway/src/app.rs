//! Axum router assembly: CORS allowlist, body-limit, tracing, timeout, rate
//! limiting, then the route table itself.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{enforce_rate_limit, stamp_request_id};
use crate::routes::{chat, oauth, prompts, resources, servers, share, tools, widgets};
use crate::state::AppState;

const ONE_MIB: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(600));

    let web_routes = Router::new()
        .route("/servers/validate", post(servers::validate))
        .route("/servers/check-oauth", post(servers::check_oauth))
        .route("/tools/list", post(tools::list))
        .route("/tools/execute", post(tools::execute))
        .route("/resources/list", post(resources::list))
        .route("/resources/read", post(resources::read))
        .route("/prompts/list", post(prompts::list))
        .route("/prompts/list-multi", post(prompts::list_multi))
        .route("/prompts/get", post(prompts::get))
        .route("/chat-v2", post(chat::chat_v2))
        .route("/apps/mcp-apps/widget-content", post(widgets::mcp_apps_widget_content))
        .route(
            "/apps/chatgpt-apps/widget-content",
            post(widgets::chatgpt_apps_widget_content),
        )
        .route("/chatgpt-apps/upload-file", post(widgets::upload_file_unsupported))
        .route("/file/{id}", get(widgets::file_unsupported))
        .route("/oauth/proxy", post(oauth::proxy))
        .route("/oauth/metadata", get(oauth::metadata))
        .route("/share/{token}/resolve", post(share::resolve))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(state.clone(), enforce_rate_limit));

    Router::new()
        .nest("/web", web_routes)
        .route("/healthz", get(|| async { "ok" }))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(stamp_request_id))
                .layer(TraceLayer::new_for_http())
                .layer(SetSensitiveRequestHeadersLayer::new([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::COOKIE,
                ]))
                .layer(cors)
                .layer(DefaultBodyLimit::max(ONE_MIB))
                .layer(TimeoutLayer::new(state.config.stream_timeout)),
        )
        .with_state(state)
}

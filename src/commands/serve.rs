use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Host, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, ServiceExt};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::clock::Now;
use crate::config::Config;
use crate::controllers;
use crate::db::Database;
use crate::error::ApiError;
use crate::html;
use crate::types::api::{CreatePaste, CreatedPaste, PasteView};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from((app.config.address, app.config.port));
    let database = app.database.clone();

    database.init_schema().await?;

    if app.config.test_mode {
        info!("test mode enabled, honoring {} header", crate::clock::TEST_NOW_HEADER);
    }
    info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(service(app).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    database.close().await;

    Ok(())
}

/// The router wrapped so that `/pastes/` and `/pastes` route the same.
pub fn service(app: App) -> NormalizePath<Router> {
    NormalizePath::trim_trailing_slash(router(app))
}

pub fn router(app: App) -> Router {
    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/pastes", post(create_paste))
        .route("/pastes/:id", get(get_paste))
        .route("/view/:id", get(view_paste));

    Router::new()
        .route("/", get(index))
        .route("/p/:id", get(render_paste))
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(app.config.limits.max_upload_size))
        .layer(cors_layer(&app.config.cors_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid CORS origin: {origin}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn index() -> Json<Value> {
    Json(json!({ "ok": true, "message": "ephembin" }))
}

async fn healthz(State(db): State<Database>) -> Json<Value> {
    Json(json!({ "ok": db.ping().await }))
}

async fn create_paste(
    State(app): State<App>,
    Now(now): Now,
    host: Option<Host>,
    headers: HeaderMap,
    payload: Result<Json<CreatePaste>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let paste = controllers::paste::create(&app, payload.validate()?, now).await?;

    let base_url = base_url(&app.config, host.map(|Host(host)| host), &headers);
    let url = format!("{base_url}/p/{id}", id = paste.id);

    Ok((StatusCode::CREATED, Json(CreatedPaste { id: paste.id, url })))
}

async fn get_paste(
    State(app): State<App>,
    Now(now): Now,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<PasteView>> {
    let paste = controllers::paste::consume(&app, &id, now).await?;
    Ok(Json(paste.into()))
}

async fn view_paste(
    State(app): State<App>,
    Now(now): Now,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<PasteView>> {
    let paste = controllers::paste::peek(&app, &id, now).await?;
    Ok(Json(paste.into()))
}

async fn render_paste(
    State(app): State<App>,
    Now(now): Now,
    Path(id): Path<String>,
) -> Response {
    match controllers::paste::peek(&app, &id, now).await {
        Ok(paste) => Html(html::render_paste(&paste).into_string()).into_response(),
        Err(ApiError::NotFound) => {
            (StatusCode::NOT_FOUND, Html(html::not_found_page().into_string())).into_response()
        }
        Err(e) => {
            e.log();
            let page = html::internal_error_page().into_string();
            (e.status_code(), Html(page)).into_response()
        }
    }
}

/// The base URL for share links: the configured one, else derived from the
/// request's forwarded protocol and host.
fn base_url(config: &Config, host: Option<String>, headers: &HeaderMap) -> String {
    if let Some(base_url) = &config.base_url {
        return base_url.trim_end_matches('/').to_owned();
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");
    let host = host.unwrap_or_else(|| format!("localhost:{}", config.port));

    format!("{proto}://{host}")
}

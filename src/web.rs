//! HTTP API for the collection tracker
//!
//! JSON in and out with a uniform response envelope. The fronting session
//! layer supplies the authenticated user id via the `X-User-Id` header;
//! requests that touch per-user state are rejected before any data access
//! when it is missing. Database errors never propagate as panics: handlers
//! catch them at the boundary, log, and translate to an error payload.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::database::{self, OwnershipUpdate};
use crate::deck::parse_deck;
use crate::export;
use crate::import;
use crate::reconcile::{reconcile_deck, reconcile_import, DeckBreakdown};
use crate::session::{FilterState, SessionStore};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    sessions: Arc<SessionStore>,
    http: reqwest::Client,
    import_base_url: String,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn ok_json<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// Authenticated user id from the `X-User-Id` header
fn require_user(headers: &HeaderMap) -> Result<i64, Response> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| error_json(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

#[derive(Deserialize)]
struct ParseDeckRequest {
    decklist: String,
}

#[derive(Serialize)]
struct DeckSessionResponse {
    session_id: String,
    breakdown: DeckBreakdown,
}

/// POST /api/deck/parse - parse pasted decklist text and reconcile it
async fn parse_deck_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ParseDeckRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let parsed = parse_deck(&body.decklist);
    let breakdown = {
        let conn = state.db.lock().unwrap();
        match reconcile_deck(&conn, user_id, &parsed) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                log::error!("Deck reconciliation failed: {}", e);
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    };

    let session_id = state.sessions.insert(breakdown.clone());
    ok_json(DeckSessionResponse {
        session_id,
        breakdown,
    })
}

#[derive(Deserialize)]
struct ImportDeckRequest {
    slug: String,
}

/// POST /api/deck/import - fetch a deck from the import service and reconcile it
async fn import_deck_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ImportDeckRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let deck = match import::fetch_deck(&state.http, &state.import_base_url, &body.slug).await {
        Ok(deck) => deck,
        Err(e) => {
            log::warn!("Deck import failed for {:?}: {}", body.slug, e);
            return error_json(
                StatusCode::BAD_GATEWAY,
                format!("Failed to fetch decklist: {}", e),
            );
        }
    };

    let breakdown = {
        let conn = state.db.lock().unwrap();
        match reconcile_import(&conn, user_id, &deck) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                log::error!("Import reconciliation failed: {}", e);
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    };

    let session_id = state.sessions.insert(breakdown.clone());
    ok_json(DeckSessionResponse {
        session_id,
        breakdown,
    })
}

#[derive(Deserialize)]
struct DeckTableParams {
    session: String,
    #[serde(default)]
    edition: Option<String>,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(default)]
    foiling: Option<String>,
    #[serde(default, rename = "artVariation")]
    art_variation: Option<String>,
}

/// GET /api/deck/table - filtered flat rows of a previously reconciled deck
///
/// No `X-User-Id` check here: the session id is the capability. Ownership
/// figures were computed for the requesting user when the session was
/// created, and the stored breakdown holds no data beyond that snapshot.
async fn deck_table_handler(
    State(state): State<AppState>,
    Query(params): Query<DeckTableParams>,
) -> Response {
    let incoming = FilterState {
        edition: params.edition,
        rarity: params.rarity,
        foiling: params.foiling,
        art_variation: params.art_variation,
    };

    match state.sessions.filtered_rows(&params.session, &incoming) {
        Some(rows) => ok_json(rows),
        None => error_json(StatusCode::NOT_FOUND, "Session expired or unknown"),
    }
}

#[derive(Deserialize)]
struct UpdateCollectionRequest {
    updates: Vec<OwnershipUpdate>,
}

#[derive(Serialize)]
struct UpdateCollectionResponse {
    message: String,
    written: usize,
    unchanged: usize,
    skipped: usize,
    updated_cards: Vec<String>,
}

/// POST /api/collection/update - apply an ownership update batch atomically
async fn update_collection_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateCollectionRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut conn = state.db.lock().unwrap();
    match database::apply_ownership_updates(&mut conn, user_id, &body.updates) {
        Ok(result) => {
            let message = if result.written > 0 {
                "Card ownership successfully updated."
            } else {
                "No updates made"
            };
            ok_json(UpdateCollectionResponse {
                message: message.to_string(),
                written: result.written,
                unchanged: result.unchanged,
                skipped: result.skipped,
                updated_cards: result.updated_cards,
            })
        }
        Err(e) => {
            log::error!("Ownership update batch failed, rolled back: {}", e);
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    }
}

/// GET /api/collection - owned printings with optional filters
async fn collection_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filters): Query<FilterState>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let conn = state.db.lock().unwrap();
    match database::collection_rows(&conn, user_id) {
        Ok(rows) => {
            let rows: Vec<_> = rows
                .into_iter()
                .filter(|row| {
                    filters.matches(
                        &row.edition,
                        &row.rarity,
                        &row.foiling,
                        row.art_variation.as_deref(),
                    )
                })
                .collect();
            ok_json(rows)
        }
        Err(e) => {
            log::error!("Collection query failed: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

/// GET /api/collection/export.csv - CSV download of owned printings
async fn export_csv_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let rows = {
        let conn = state.db.lock().unwrap();
        match database::collection_rows(&conn, user_id) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Collection query failed: {}", e);
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    };

    match export::collection_csv_bytes(&rows) {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/csv")
            .header(
                header::CONTENT_DISPOSITION,
                "attachment;filename=collection.csv",
            )
            .body(Body::from(bytes))
            .unwrap(),
        Err(e) => {
            log::error!("CSV export failed: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Export failed")
        }
    }
}

/// Build the API router
pub fn create_router(
    db: Arc<Mutex<Connection>>,
    sessions: Arc<SessionStore>,
    import_base_url: String,
) -> Router {
    let state = AppState {
        db,
        sessions,
        http: reqwest::Client::new(),
        import_base_url,
    };

    Router::new()
        .route("/api/deck/parse", post(parse_deck_handler))
        .route("/api/deck/import", post(import_deck_handler))
        .route("/api/deck/table", get(deck_table_handler))
        .route("/api/collection", get(collection_handler))
        .route("/api/collection/update", post(update_collection_handler))
        .route("/api/collection/export.csv", get(export_csv_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
pub async fn serve(
    db: Arc<Mutex<Connection>>,
    sessions: Arc<SessionStore>,
    import_base_url: String,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(db, sessions, import_base_url);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Axum router and HTTP handlers.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use trickle_core::constants::format_tokens;
use trickle_core::{Address, FaucetError, Ledger};

use crate::AppState;

// Embed the web UI at compile time.
const INDEX_HTML: &str = include_str!("static/index.html");

/// Events returned by `/api/events` when no limit is given.
const DEFAULT_EVENT_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(web_ui))
        .route("/health", get(health))
        .route("/api/faucet", post(api_faucet))
        .route("/api/status", get(api_status))
        .route("/api/accounts/:address", get(api_account))
        .route("/api/events", get(api_events))
        .route("/api/admin/pause", post(admin_pause))
        .route("/api/admin/ledger", post(admin_ledger))
        .with_state(state)
        .layer(cors)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Serve the embedded web UI.
async fn web_ui() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct FaucetRequest {
    address: String,
}

/// `POST /api/faucet`: claim for the given address at the current time.
async fn api_faucet(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> impl IntoResponse {
    let address = match parse_requester(&req.address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let engine = &state.deployment.engine;
    match engine.request_claim(address) {
        Ok(receipt) => {
            info!(%address, claims = receipt.record.total_claimed_count, "Faucet claim");
            persist(&state).await;
            (
                StatusCode::OK,
                Json(json!({
                    "address": address,
                    "amount": receipt.amount.to_string(),
                    "amount_tokens": format_tokens(receipt.amount),
                    "timestamp": receipt.timestamp,
                    "claims": receipt.record.total_claimed_count,
                    "remaining_allowance": engine.remaining_allowance(address).to_string(),
                    "next_claim_at": engine.next_claim_at(address),
                    "balance": state.deployment.token.balance_of(address).to_string(),
                })),
            )
        }
        Err(e) => faucet_error(&e),
    }
}

/// `GET /api/status`: global faucet state.
async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    let engine = &state.deployment.engine;
    let token = &state.deployment.token;
    let policy = engine.policy();
    let metadata = token.metadata();

    (
        StatusCode::OK,
        Json(json!({
            "paused": engine.is_paused(),
            "administrator": engine.administrator(),
            "engine": engine.address(),
            "ledger": engine.ledger_address(),
            "policy": {
                "claim_amount": policy.claim_amount.to_string(),
                "claim_amount_tokens": format_tokens(policy.claim_amount),
                "cooldown_secs": policy.cooldown_secs,
                "max_claims": policy.max_claims,
                "lifetime_cap": policy.lifetime_cap().to_string(),
            },
            "token": {
                "address": token.address(),
                "name": metadata.name,
                "symbol": metadata.symbol,
                "decimals": metadata.decimals,
                "total_supply": token.total_supply().to_string(),
                "max_supply": token.max_supply().map(|s| s.to_string()),
            },
            "requesters": engine.requester_count(),
            "time": engine.now(),
        })),
    )
}

/// `GET /api/accounts/{address}`: balance and eligibility of one requester.
async fn api_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let address = match parse_requester(&address) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let engine = &state.deployment.engine;
    let now = engine.now();
    let record = engine.record(address);
    let next_claim_at = engine.next_claim_at(address);

    (
        StatusCode::OK,
        Json(json!({
            "address": address,
            "balance": state.deployment.token.balance_of(address).to_string(),
            "can_claim": engine.can_claim_at(address, now),
            "remaining_allowance": engine.remaining_allowance(address).to_string(),
            "claims": record.total_claimed_count,
            "max_claims": engine.policy().max_claims,
            "last_claim_time": record.last_claim_time,
            "next_claim_at": next_claim_at,
            "next_claim_at_utc": next_claim_at.and_then(rfc3339),
            "seconds_until_claim": next_claim_at.map(|t| t.saturating_sub(now)).unwrap_or(0),
            "status": engine.claim_status_at(address, now),
        })),
    )
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
}

/// `GET /api/events`: most recent engine events, oldest first.
async fn api_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    (
        StatusCode::OK,
        Json(json!({ "events": state.events.recent(limit) })),
    )
}

#[derive(Deserialize)]
struct PauseRequest {
    paused: bool,
}

/// `POST /api/admin/pause`: set the pause flag.
async fn admin_pause(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PauseRequest>,
) -> impl IntoResponse {
    let caller = extract_caller(&headers, &state);
    match state.deployment.engine.set_paused(caller, req.paused) {
        Ok(()) => {
            persist(&state).await;
            (StatusCode::OK, Json(json!({ "paused": req.paused })))
        }
        Err(e) => faucet_error(&e),
    }
}

#[derive(Deserialize)]
struct BindRequest {
    address: String,
}

/// `POST /api/admin/ledger`: bind a known ledger by address.
async fn admin_ledger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BindRequest>,
) -> impl IntoResponse {
    let address: Address = match req.address.trim().parse() {
        Ok(a) => a,
        Err(e) => return bad_request(&format!("Invalid ledger address: {e}")),
    };
    let token = &state.deployment.token;
    if address != token.address() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown ledger {address}"), "kind": "unknown_ledger" })),
        );
    }

    let caller = extract_caller(&headers, &state);
    match state.deployment.engine.bind_ledger(caller, token.clone()) {
        Ok(()) => {
            persist(&state).await;
            (StatusCode::OK, Json(json!({ "ledger": address })))
        }
        Err(e) => faucet_error(&e),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map an engine error to an HTTP status and JSON body.
fn faucet_error(e: &FaucetError) -> (StatusCode, Json<Value>) {
    let status = match e {
        FaucetError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        FaucetError::NotBound | FaucetError::Paused => StatusCode::SERVICE_UNAVAILABLE,
        FaucetError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        FaucetError::LifetimeLimitReached { .. } => StatusCode::FORBIDDEN,
        FaucetError::Ledger(_) => StatusCode::BAD_GATEWAY,
    };
    let mut body = json!({ "error": e.to_string(), "kind": e.kind() });
    if let FaucetError::CooldownActive { next_claim_at } = e {
        body["next_claim_at"] = json!(next_claim_at);
    }
    (status, Json(body))
}

fn bad_request(msg: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": msg, "kind": "bad_request" })),
    )
}

/// Parse a requester address, rejecting the zero address.
fn parse_requester(raw: &str) -> Result<Address, (StatusCode, Json<Value>)> {
    let address: Address = raw
        .trim()
        .parse()
        .map_err(|e| bad_request(&format!("Invalid address: {e}")))?;
    if address.is_zero() {
        return Err(bad_request("The zero address cannot claim"));
    }
    Ok(address)
}

/// The engine's administrator if the request carries the admin bearer token,
/// otherwise the anonymous zero identity.
///
/// The administrator comes from the engine, not the configuration: it is
/// fixed at deployment and survives restarts with a different
/// `FAUCET_ADMIN_ADDRESS`.
fn extract_caller(headers: &HeaderMap, state: &AppState) -> Address {
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(token) if token == state.config.admin_token => state.deployment.engine.administrator(),
        Some(_) => {
            warn!("Admin request with wrong bearer token");
            Address::ZERO
        }
        None => Address::ZERO,
    }
}

fn rfc3339(ts: u64) -> Option<String> {
    DateTime::from_timestamp(i64::try_from(ts).ok()?, 0).map(|d| d.to_rfc3339())
}

/// Save state after a change on the blocking pool. A failed save is
/// logged; the change stands.
async fn persist(state: &AppState) {
    let deployment = state.deployment.clone();
    let path = state.config.state_path.clone();
    match tokio::task::spawn_blocking(move || deployment.save(&path)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to persist faucet state"),
        Err(e) => error!(error = %e, "State save task failed"),
    }
}

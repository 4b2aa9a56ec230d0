use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fruitreels_core::{GameError, PlayedRound, ProvablyFairRng, SessionStore, DEFAULT_ACCOUNT};
use fruitreels_shared::{
    AccountView, ApiError, CashoutRequest, CashoutResponse, ResetResponse, SpinRequest,
    SpinResponse, VerifyResponse,
};

mod config;
mod ledger;

use config::ServerConfig;
use ledger::RoundRecord;

const ACCOUNT_HEADER: &str = "x-account-id";

struct AppState {
    db: SqlitePool,
    store: SessionStore,
    api_key: String,
    // serializes nonce allocation
    seed_lock: Mutex<()>,
}

struct ApiFailure(ApiError);

impl From<ApiError> for ApiFailure {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<GameError> for ApiFailure {
    fn from(e: GameError) -> Self {
        Self(ApiError::Rejected(e))
    }
}

impl From<anyhow::Error> for ApiFailure {
    fn from(e: anyhow::Error) -> Self {
        error!("storage error: {e:#}");
        Self(ApiError::Internal)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiError::Invalid(_) | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0.body())).into_response()
    }
}

fn account_id(headers: &HeaderMap) -> String {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ACCOUNT)
        .to_string()
}

// An empty body is the same as `{}`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiFailure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Invalid(e.to_string()).into())
}

async fn route_verify(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VerifyResponse>, ApiFailure> {
    let p = ledger::get_params(&state.db).await?;
    Ok(Json(VerifyResponse {
        server_seed_hash: p.server_seed_hash,
    }))
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SpinResponse>, ApiFailure> {
    let req: SpinRequest = parse_body(&body)?;
    let account = account_id(&headers);
    let client_seed = req.client_seed.unwrap_or_else(|| account.clone());

    let params = {
        let _guard = state.seed_lock.lock().await;
        ledger::next_nonce(&state.db).await?
    };
    let mut rng = ProvablyFairRng::new(&params.server_seed, &client_seed, params.nonce as u64);
    let PlayedRound {
        outcome,
        balance_in,
    } = state.store.play(&account, req.session, &mut rng)?;

    let record = RoundRecord {
        account: &account,
        client_seed: &client_seed,
        nonce: params.nonce,
        server_seed_hash: &params.server_seed_hash,
        balance_in,
        outcome: &outcome,
    };
    // the round has already happened; a ledger failure must not hide it
    if let Err(e) = ledger::record_round(&state.db, &record).await {
        error!(account = %account, nonce = params.nonce, "failed to record round: {e:#}");
    }

    Ok(Json(SpinResponse::new(
        outcome,
        params.server_seed_hash,
        params.nonce as u64,
    )))
}

async fn route_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ResetResponse> {
    let account = account_id(&headers);
    Json(ResetResponse::from(state.store.reset(&account)))
}

async fn route_cashout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CashoutResponse>, ApiFailure> {
    let req: CashoutRequest = parse_body(&body)?;
    let account = account_id(&headers);
    let cashout = state.store.cash_out(&account, req.session)?;

    if let Err(e) = ledger::record_cashout(&state.db, &account, &cashout).await {
        error!(account = %account, "failed to record cashout: {e:#}");
    }
    Ok(Json(CashoutResponse::from(cashout)))
}

fn authorize(state: &AppState, bearer: &Bearer) -> Result<(), StatusCode> {
    if bearer.token() != state.api_key {
        warn!("admin request with bad token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

async fn route_admin_account(
    State(state): State<Arc<AppState>>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(account): Path<String>,
) -> Result<Json<AccountView>, StatusCode> {
    authorize(&state, &bearer)?;
    Ok(Json(AccountView {
        session: state.store.session(&account),
        wallet_balance: state.store.wallet(&account).balance,
        account,
    }))
}

async fn route_admin_reset(
    State(state): State<Arc<AppState>>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(account): Path<String>,
) -> Result<Json<ResetResponse>, StatusCode> {
    authorize(&state, &bearer)?;
    Ok(Json(ResetResponse::from(state.store.reset(&account))))
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", get(route_verify))
        .route("/api/slot", post(route_spin).delete(route_reset))
        .route("/api/cashout", post(route_cashout))
        .route("/admin/accounts/:account", get(route_admin_account))
        .route("/admin/accounts/:account/reset", post(route_admin_reset))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn spawn_depleted_reset(state: Arc<AppState>, idle: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            state.store.reset_depleted(idle);
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let config = ServerConfig::from_env()?;

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    ledger::init_db(&db).await?;

    info!(
        snapshot_policy = ?config.store.snapshot_policy,
        credit_rewards = config.store.credit_rewards,
        "session store configured"
    );
    let state = Arc::new(AppState {
        db,
        store: SessionStore::new(config.store),
        api_key: config.api_key,
        seed_lock: Mutex::new(()),
    });
    if let Some(idle) = config.depleted_reset {
        spawn_depleted_reset(state.clone(), idle);
    }

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::api::websocket::holders_ws_handler;
use crate::error::{ScanError, ScanResult};
use crate::services::report::{self, DexSlice};
use crate::Scanner;

const DEFAULT_DEX_LIMIT: usize = 10;
const DEFAULT_MIN_SHARE: f64 = 1.0;

pub struct AppState {
    pub scanner: Scanner,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Scan(e @ ScanError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, e.user_message())
            }
            ApiError::Scan(e @ ScanError::Cancelled) => {
                (StatusCode::REQUEST_TIMEOUT, e.user_message())
            }
            ApiError::Scan(e) => {
                tracing::warn!("Scan failed: {}", e);
                (StatusCode::BAD_GATEWAY, e.user_message())
            }
            ApiError::Export(e) => {
                tracing::error!("CSV export failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Export failed, please try again later.".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    format: Option<String>,
}

impl FormatQuery {
    fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("csv"))
    }
}

#[derive(Debug, Deserialize)]
pub struct BurnQuery {
    name: Option<String>,
    address: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DexQuery {
    limit: Option<usize>,
    min_share: Option<f64>,
}

/// Runs `scan` until it finishes or `deadline` passes, cancelling `cancel` on expiry.
pub(crate) async fn within<T>(
    deadline: Duration,
    cancel: &CancellationToken,
    scan: impl Future<Output = ScanResult<T>>,
) -> ScanResult<T> {
    tokio::select! {
        biased;
        result = scan => result,
        _ = tokio::time::sleep(deadline) => {
            tracing::warn!("Scan exceeded {:?}, cancelling", deadline);
            cancel.cancel();
            Err(ScanError::Cancelled)
        }
    }
}

fn csv_attachment(filename: String, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn respond<T, F>(
    result: T,
    csv: bool,
    filename: impl FnOnce(&T) -> String,
    export: F,
) -> Result<Response, ApiError>
where
    T: Serialize,
    F: FnOnce(&T) -> Result<String, csv::Error>,
{
    if csv {
        let body = export(&result)?;
        Ok(csv_attachment(filename(&result), body))
    } else {
        Ok(Json(result).into_response())
    }
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /burn?name=..&address=..
async fn get_burn(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BurnQuery>,
) -> Result<Response, ApiError> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ScanError::validation("name", "a token name is required"))?;
    let address = query.address.as_deref();

    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.deadline(),
        &cancel,
        state.scanner.burn.scan(name, address, &cancel),
    )
    .await?;

    let csv = FormatQuery { format: query.format.clone() }.wants_csv();
    respond(
        result,
        csv,
        |r| format!("{}-burned.csv", r.name.to_lowercase()),
        |r| report::burn_csv(r, address),
    )
}

/// GET /holders/:address
async fn get_holders(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(format): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.holder_deadline(),
        &cancel,
        state.scanner.holders.scan(&address, None, &cancel),
    )
    .await?;

    respond(
        result,
        format.wants_csv(),
        |_| format!("{}-holders.csv", address.to_lowercase()),
        report::holders_csv,
    )
}

/// GET /liquidity/:address
async fn get_liquidity(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(format): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.deadline(),
        &cancel,
        state.scanner.liquidity.scan(&address, &cancel),
    )
    .await?;

    respond(
        result,
        format.wants_csv(),
        |_| format!("{}-liquidity.csv", address.to_lowercase()),
        report::liquidity_csv,
    )
}

/// GET /liquidity/:address/dex?limit=10
async fn get_liquidity_by_dex(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<DexQuery>,
) -> Result<Json<Vec<DexSlice>>, ApiError> {
    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.deadline(),
        &cancel,
        state.scanner.liquidity.scan(&address, &cancel),
    )
    .await?;
    Ok(Json(report::liquidity_by_dex(
        &result,
        query.limit.unwrap_or(DEFAULT_DEX_LIMIT),
    )))
}

/// GET /volume/:address
async fn get_volume(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(format): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.deadline(),
        &cancel,
        state.scanner.volume.scan(&address, &cancel),
    )
    .await?;

    respond(
        result,
        format.wants_csv(),
        |_| format!("{}-volume.csv", address.to_lowercase()),
        report::volume_csv,
    )
}

/// GET /volume/:address/dex?min_share=1.0
async fn get_volume_by_dex(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<DexQuery>,
) -> Result<Json<Vec<DexSlice>>, ApiError> {
    let cancel = CancellationToken::new();
    let result = within(
        state.scanner.deadline(),
        &cancel,
        state.scanner.volume.scan(&address, &cancel),
    )
    .await?;
    Ok(Json(report::volume_by_dex(
        &result,
        query.min_share.unwrap_or(DEFAULT_MIN_SHARE),
    )))
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/burn", get(get_burn))
        .route("/holders/:address", get(get_holders))
        .route("/liquidity/:address", get(get_liquidity))
        .route("/liquidity/:address/dex", get(get_liquidity_by_dex))
        .route("/volume/:address", get(get_volume))
        .route("/volume/:address/dex", get(get_volume_by_dex))
        .route("/ws/holders/:address", get(holders_ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_within_cancels_on_deadline() {
        let cancel = CancellationToken::new();
        let watched = cancel.clone();
        let result: ScanResult<()> = within(Duration::from_secs(5), &cancel, async move {
            watched.cancelled().await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_within_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = within(Duration::from_secs(5), &cancel, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: ScanError| ApiError::from(e).into_response().status();
        assert_eq!(status(ScanError::validation("address", "bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status(ScanError::Empty("none".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(ScanError::Cancelled), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_format_query() {
        let q = |f: Option<&str>| FormatQuery { format: f.map(str::to_string) };
        assert!(q(Some("csv")).wants_csv());
        assert!(q(Some("CSV")).wants_csv());
        assert!(!q(Some("json")).wants_csv());
        assert!(!q(None).wants_csv());
    }
}

// Courier Dispatch - REST API
// Thin axum shell: decode JSON, call DispatchService, encode the result

use crate::db::SqliteStore;
use crate::entities::EntityKind;
use crate::error::DispatchError;
use crate::service::{CompleteRequest, DispatchService};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SqliteStore>>,
}

impl AppState {
    pub fn new(store: SqliteStore) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteStore>, DispatchError> {
        self.store
            .lock()
            .map_err(|_| DispatchError::Store(anyhow::anyhow!("store lock poisoned")))
    }
}

// ============================================================================
// Error mapping
// ============================================================================

fn id_list(ids: &[Option<i64>]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "id": id })).collect()
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            DispatchError::Validation { entity, invalid } => (
                StatusCode::BAD_REQUEST,
                json!({ "validation_error": { (entity.as_str()): id_list(invalid) } }),
            ),
            DispatchError::PatchRejected { id } => (
                StatusCode::BAD_REQUEST,
                json!({ "patch_error": { (EntityKind::Couriers.as_str()): id_list(&[Some(*id)]) } }),
            ),
            DispatchError::InvalidRequest(message)
            | DispatchError::NotFound(message)
            | DispatchError::Conflict(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            DispatchError::Store(err) => {
                tracing::error!(error = %format!("{:#}", err), "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, DispatchError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| DispatchError::InvalidRequest(rejection.body_text()))
}

fn data_records(body: &Value) -> Result<&[Value], DispatchError> {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| DispatchError::InvalidRequest("no data key".to_string()))
}

fn id_objects(ids: Vec<i64>) -> Vec<Value> {
    ids.into_iter().map(|id| json!({ "id": id })).collect()
}

// ============================================================================
// API Handlers
// ============================================================================

/// POST /couriers - Import a courier batch
async fn import_couriers(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let body = json_body(payload)?;
    let mut store = state.lock()?;

    let ids = DispatchService::new(&mut *store).import_couriers(data_records(&body)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "couriers": id_objects(ids) }))))
}

/// PATCH /couriers/:courier_id - Partial courier update
async fn patch_courier(
    State(state): State<AppState>,
    Path(courier_id): Path<i64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let body = json_body(payload)?;
    let mut store = state.lock()?;

    let courier = DispatchService::new(&mut *store).patch_courier(courier_id, &body)?;
    Ok(Json(courier))
}

/// GET /couriers/:courier_id - Courier profile with rating and earnings
async fn courier_info(
    State(state): State<AppState>,
    Path(courier_id): Path<i64>,
) -> Result<impl IntoResponse, DispatchError> {
    let mut store = state.lock()?;

    let info = DispatchService::new(&mut *store).courier_info(courier_id)?;
    Ok(Json(info))
}

/// POST /orders - Import an order batch
async fn import_orders(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let body = json_body(payload)?;
    let mut store = state.lock()?;

    let ids = DispatchService::new(&mut *store).import_orders(data_records(&body)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "orders": id_objects(ids) }))))
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    courier_id: Option<i64>,
}

/// POST /orders/assign - Assign every eligible free order to a courier
async fn assign_orders(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let body = json_body(payload)?;
    let courier_id = serde_json::from_value::<AssignRequest>(body)
        .ok()
        .and_then(|request| request.courier_id)
        .ok_or_else(|| DispatchError::InvalidRequest("courier_id is required".to_string()))?;
    let mut store = state.lock()?;

    let result = DispatchService::new(&mut *store).assign_orders(courier_id)?;
    Ok(Json(result))
}

/// POST /orders/complete - Mark an order delivered
async fn complete_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, DispatchError> {
    let body = json_body(payload)?;
    let request: CompleteRequest = serde_json::from_value(body)
        .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
    let mut store = state.lock()?;

    let order_id = DispatchService::new(&mut *store).complete_order(&request)?;
    Ok(Json(json!({ "order_id": order_id })))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/couriers", post(import_couriers))
        .route("/couriers/:courier_id", get(courier_info).patch(patch_courier))
        .route("/orders", post(import_orders))
        .route("/orders/assign", post(assign_orders))
        .route("/orders/complete", post(complete_order))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use crate::{
    api::models::charges::{AsyncChargeResponse, ChargeCreate, ChargeResponse, TaskResponse},
    db::LedgerStore,
    errors::{Error, ErrorResponse, Result},
    ledger::{ChargeOutcome, ChargeRequest, LedgerError},
    tasks::TaskState,
    types::TaskId,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

fn charge_request<S: LedgerStore>(state: &AppState<S>, data: &ChargeCreate, related_id: Option<Uuid>) -> Result<ChargeRequest> {
    if data.cost <= 0 {
        return Err(Error::BadRequest {
            message: "Cost must be greater than zero".to_string(),
        });
    }
    Ok(ChargeRequest {
        user_id: data.user_id,
        cost: data.cost,
        description: data.description.clone(),
        related_id,
        timeout: state.config.charges.provider_timeout,
    })
}

async fn run_charge<S: LedgerStore>(state: &AppState<S>, request: ChargeRequest, payload: &str) -> std::result::Result<ChargeOutcome, LedgerError> {
    let provider = state.provider.clone();
    state.charges().with_charge(request, || async move { provider.call(payload).await }).await
}

/// Run a paid provider call
#[utoipa::path(
    post,
    path = "/charges",
    tag = "charges",
    summary = "Run a paid provider call",
    description = "Deducts `cost` points, calls the text provider with `payload` and returns its output. \
                   If the call fails, times out or returns nothing the points are refunded.",
    request_body = ChargeCreate,
    responses(
        (status = 200, description = "Provider output", body = ChargeResponse),
        (status = 400, description = "Invalid cost", body = ErrorResponse),
        (status = 402, description = "Insufficient balance; the provider was not called", body = ErrorResponse),
        (status = 502, description = "Provider failed. `ProviderFailure`: the charge was refunded. `RefundFailed`: the refund could not be written and the charge stands", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn create_charge<S: LedgerStore>(State(state): State<AppState<S>>, Json(data): Json<ChargeCreate>) -> Result<Json<ChargeResponse>> {
    let request = charge_request(&state, &data, None)?;
    let outcome = run_charge(&state, request, &data.payload).await?;
    Ok(Json(outcome.into()))
}

/// Start a paid provider call in the background
#[utoipa::path(
    post,
    path = "/charges/async",
    tag = "charges",
    summary = "Start a paid provider call in the background",
    description = "Same semantics as `POST /charges`, but returns a task ID immediately. Poll `GET /tasks/{task_id}` for the outcome.",
    request_body = ChargeCreate,
    responses(
        (status = 202, description = "Charge accepted", body = AsyncChargeResponse),
        (status = 400, description = "Invalid cost", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn create_async_charge<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(data): Json<ChargeCreate>,
) -> Result<(StatusCode, Json<AsyncChargeResponse>)> {
    let task_id = Uuid::new_v4();
    let request = charge_request(&state, &data, Some(task_id))?;
    state.tasks.set(task_id, &TaskState::Pending).await?;

    let span = info_span!("async_charge", %task_id, user_id = %data.user_id);
    tokio::spawn(
        async move {
            let finished = match run_charge(&state, request, &data.payload).await {
                Ok(outcome) => TaskState::Completed {
                    output: outcome.output,
                    new_balance: outcome.new_balance,
                    transaction_id: outcome.transaction_id,
                },
                Err(e) => TaskState::Failed {
                    error_code: e.error_code().to_string(),
                    message: Error::from(e).user_message(),
                },
            };
            if let Err(e) = state.tasks.set(task_id, &finished).await {
                error!(error = %e, "Failed to record async charge outcome");
            }
        }
        .instrument(span),
    );

    Ok((StatusCode::ACCEPTED, Json(AsyncChargeResponse { task_id })))
}

/// Get the state of a background charge
#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    tag = "charges",
    summary = "Get a background charge's state",
    params(
        ("task_id" = String, Path, format = "uuid", description = "Task ID returned by `POST /charges/async`"),
    ),
    responses(
        (status = 200, description = "Task state", body = TaskResponse),
        (status = 404, description = "Unknown or expired task", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn get_task<S: LedgerStore>(State(state): State<AppState<S>>, Path(task_id): Path<TaskId>) -> Result<Json<TaskResponse>> {
    let task_state = state.tasks.get(task_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Task".to_string(),
        id: task_id.to_string(),
    })?;
    Ok(Json(TaskResponse { task_id, state: task_state }))
}

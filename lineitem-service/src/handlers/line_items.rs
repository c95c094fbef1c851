//! Line item edit form endpoints.

use crate::controller::{parse_positive_id, LineItemValues, LoadedLineItem, SubmitOutcome};
use crate::form::{FormController, FormLayout, LineItemSubmission, RequestContext};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Extension, Form, Json,
};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct EditFormResponse {
    pub defaults: LineItemValues,
    pub layout: FormLayout,
}

fn request_context(state: &AppState, request_id: Option<Extension<RequestId>>) -> RequestContext {
    let request_id = request_id
        .map(|Extension(id)| id.0)
        .unwrap_or_else(|| "-".to_string());
    RequestContext::new(request_id, state.translator.clone())
}

async fn load(
    state: &AppState,
    ctx: &RequestContext,
    raw_id: &str,
) -> Result<LoadedLineItem, AppError> {
    let id = parse_positive_id(raw_id)?;
    state.controller.load(ctx, id).await
}

/// Render the edit form: default values plus field layout.
pub async fn edit_form(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Path(id): Path<String>,
) -> Result<Json<EditFormResponse>, AppError> {
    let ctx = request_context(&state, request_id);
    let loaded = load(&state, &ctx, &id).await?;
    let layout = state.controller.build_fields(&ctx, &loaded).await?;

    Ok(Json(EditFormResponse {
        defaults: loaded.defaults,
        layout,
    }))
}

/// Validate and apply a submitted edit form.
pub async fn submit_edit(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Path(id): Path<String>,
    Form(params): Form<HashMap<String, String>>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let ctx = request_context(&state, request_id);
    let loaded = load(&state, &ctx, &id).await?;
    let submission = LineItemSubmission::from_params(&params)?;
    let outcome = state.controller.process(&ctx, &loaded, submission).await?;
    Ok(Json(outcome))
}

/// Apply an edit from a raw parameter map in test mode.
pub async fn test_submit(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Path(id): Path<String>,
    Json(body): Json<HashMap<String, Value>>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let ctx = request_context(&state, request_id);
    let mut params: HashMap<String, String> = body
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect();
    params.insert("id".to_string(), id);
    let outcome = state.controller.test_submit(&ctx, &params).await?;
    Ok(Json(outcome))
}

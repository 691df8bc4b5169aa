use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use super::service::MatchingService;
use super::{MatchingDecision, MatchingForm, MatchingView};
use crate::error::AppError;
use crate::portal::access::Actor;
use crate::portal::extract::{JsonBody, QueryParams};
use crate::portal::filters::ListFilter;
use crate::portal::ids::MatchingId;
use crate::portal::PortalState;

pub fn routes() -> Router<PortalState> {
    Router::new()
        .route(
            "/api/certificate-matching",
            get(list_handler).post(submit_handler),
        )
        .route(
            "/api/certificate-matching/:matching_id",
            get(get_handler).patch(edit_handler),
        )
        .route(
            "/api/certificate-matching/:matching_id/status",
            patch(status_handler),
        )
}

async fn list_handler(
    State(service): State<Arc<MatchingService>>,
    actor: Actor,
    QueryParams(filter): QueryParams<ListFilter>,
) -> Result<Json<Vec<MatchingView>>, AppError> {
    let records = service.list(&actor, &filter)?;
    Ok(Json(records.into_iter().map(|record| record.view()).collect()))
}

async fn submit_handler(
    State(service): State<Arc<MatchingService>>,
    actor: Actor,
    JsonBody(form): JsonBody<MatchingForm>,
) -> Result<impl IntoResponse, AppError> {
    let record = service.submit(&actor, form)?;
    Ok((StatusCode::CREATED, Json(record.view())))
}

async fn get_handler(
    State(service): State<Arc<MatchingService>>,
    actor: Actor,
    Path(matching_id): Path<String>,
) -> Result<Json<MatchingView>, AppError> {
    Ok(Json(service.get(&actor, &MatchingId(matching_id))?.view()))
}

async fn edit_handler(
    State(service): State<Arc<MatchingService>>,
    actor: Actor,
    Path(matching_id): Path<String>,
    JsonBody(form): JsonBody<MatchingForm>,
) -> Result<Json<MatchingView>, AppError> {
    Ok(Json(
        service.edit(&actor, &MatchingId(matching_id), form)?.view(),
    ))
}

async fn status_handler(
    State(service): State<Arc<MatchingService>>,
    actor: Actor,
    Path(matching_id): Path<String>,
    JsonBody(decision): JsonBody<MatchingDecision>,
) -> Result<Json<MatchingView>, AppError> {
    Ok(Json(
        service
            .update_status(&actor, &MatchingId(matching_id), decision)?
            .view(),
    ))
}

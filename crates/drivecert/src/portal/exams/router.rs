use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use super::service::ExamService;
use super::{ExamForm, ExamPatch, ExamView, RegistrationView, ResultUpdate};
use crate::error::AppError;
use crate::portal::access::Actor;
use crate::portal::extract::{JsonBody, QueryParams};
use crate::portal::filters::ListFilter;
use crate::portal::ids::{ExamId, RegistrationId, UserId};
use crate::portal::PortalState;

type Service = State<Arc<ExamService>>;

pub fn routes() -> Router<PortalState> {
    Router::new()
        .route("/api/exams", get(list_handler).post(create_handler))
        .route("/api/exams/:exam_id", get(get_handler).patch(update_handler))
        .route("/api/exams/:exam_id/candidates", get(candidates_handler))
        .route(
            "/api/exams/:exam_id/register",
            post(register_handler).delete(unregister_handler),
        )
        .route(
            "/api/exam-registrations/:registration_id/result",
            patch(result_handler),
        )
        .route(
            "/api/students/:student_id/exam-registrations",
            get(student_registrations_handler),
        )
}

/// Anonymous callers are allowed; they see visible exams only.
async fn list_handler(
    State(service): Service,
    actor: Option<Actor>,
    QueryParams(filter): QueryParams<ListFilter>,
) -> Result<Json<Vec<ExamView>>, AppError> {
    Ok(Json(service.list(actor.as_ref(), &filter)?))
}

async fn create_handler(
    State(service): Service,
    actor: Actor,
    JsonBody(form): JsonBody<ExamForm>,
) -> Result<impl IntoResponse, AppError> {
    let view = service.create(&actor, form)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_handler(
    State(service): Service,
    actor: Option<Actor>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamView>, AppError> {
    Ok(Json(service.get(actor.as_ref(), &ExamId(exam_id))?))
}

async fn update_handler(
    State(service): Service,
    actor: Actor,
    Path(exam_id): Path<String>,
    JsonBody(patch): JsonBody<ExamPatch>,
) -> Result<Json<ExamView>, AppError> {
    Ok(Json(service.update(&actor, &ExamId(exam_id), patch)?))
}

async fn candidates_handler(
    State(service): Service,
    actor: Actor,
    Path(exam_id): Path<String>,
) -> Result<Json<Vec<RegistrationView>>, AppError> {
    Ok(Json(service.candidates(&actor, &ExamId(exam_id))?))
}

async fn register_handler(
    State(service): Service,
    actor: Actor,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let registration = service.register(&actor, &ExamId(exam_id))?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn unregister_handler(
    State(service): Service,
    actor: Actor,
    Path(exam_id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.unregister(&actor, &ExamId(exam_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn result_handler(
    State(service): Service,
    actor: Actor,
    Path(registration_id): Path<String>,
    JsonBody(update): JsonBody<ResultUpdate>,
) -> Result<Json<RegistrationView>, AppError> {
    Ok(Json(service.record_result(
        &actor,
        &RegistrationId(registration_id),
        update,
    )?))
}

async fn student_registrations_handler(
    State(service): Service,
    actor: Actor,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<RegistrationView>>, AppError> {
    Ok(Json(
        service.student_registrations(&actor, &UserId(student_id))?,
    ))
}

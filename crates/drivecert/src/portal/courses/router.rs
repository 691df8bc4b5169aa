use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use super::service::CourseService;
use super::{CourseForm, CoursePatch, CourseView, EnrollmentUpdate, EnrollmentView};
use crate::error::AppError;
use crate::portal::access::Actor;
use crate::portal::extract::{JsonBody, QueryParams};
use crate::portal::filters::ListFilter;
use crate::portal::ids::{CourseId, EnrollmentId, UserId};
use crate::portal::PortalState;

pub fn routes() -> Router<PortalState> {
    Router::new()
        .route("/api/courses", get(list_handler).post(create_handler))
        .route(
            "/api/courses/:course_id",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
        .route("/api/courses/:course_id/enrollments", get(enrollments_handler))
        .route("/api/courses/:course_id/register", post(register_handler))
        .route("/api/enrollments/:enrollment_id", patch(enrollment_handler))
        .route(
            "/api/students/:student_id/enrollments",
            get(student_enrollments_handler),
        )
}

async fn list_handler(
    State(service): State<Arc<CourseService>>,
    QueryParams(filter): QueryParams<ListFilter>,
) -> Result<Json<Vec<CourseView>>, AppError> {
    Ok(Json(service.list(&filter)?))
}

async fn create_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    JsonBody(form): JsonBody<CourseForm>,
) -> Result<impl IntoResponse, AppError> {
    let view = service.create(&actor, form)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_handler(
    State(service): State<Arc<CourseService>>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseView>, AppError> {
    Ok(Json(service.get(&CourseId(course_id))?))
}

async fn update_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(course_id): Path<String>,
    JsonBody(patch): JsonBody<CoursePatch>,
) -> Result<Json<CourseView>, AppError> {
    Ok(Json(service.update(&actor, &CourseId(course_id), patch)?))
}

async fn delete_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(course_id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&actor, &CourseId(course_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn enrollments_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<EnrollmentView>>, AppError> {
    Ok(Json(service.enrollments(&actor, &CourseId(course_id))?))
}

async fn register_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = service.register(&actor, &CourseId(course_id))?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn enrollment_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(enrollment_id): Path<String>,
    JsonBody(update): JsonBody<EnrollmentUpdate>,
) -> Result<Json<EnrollmentView>, AppError> {
    Ok(Json(service.update_enrollment(
        &actor,
        &EnrollmentId(enrollment_id),
        update,
    )?))
}

async fn student_enrollments_handler(
    State(service): State<Arc<CourseService>>,
    actor: Actor,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<EnrollmentView>>, AppError> {
    Ok(Json(
        service.student_enrollments(&actor, &UserId(student_id))?,
    ))
}

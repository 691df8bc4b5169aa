use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use super::domain::{
    ApplicationForm, ApplicationStats, ApplicationView, CenterKind, CenterSummary, StatusUpdate,
};
use super::service::ApplicationService;
use crate::error::AppError;
use crate::portal::access::Actor;
use crate::portal::certificates::Certificate;
use crate::portal::extract::{JsonBody, QueryParams};
use crate::portal::filters::ListFilter;
use crate::portal::ids::ApplicationId;
use crate::portal::PortalState;

type Service = State<Arc<ApplicationService>>;

/// Routes for both accreditation flows. Training and testing centers share handlers but keep
/// the URL layout the portal already calls.
pub fn routes() -> Router<PortalState> {
    Router::new()
        .merge(center_routes(
            CenterKind::TrainingCenter,
            "/api/training-center-applications",
            "/api/training-centers",
        ))
        .merge(center_routes(
            CenterKind::TestingCenter,
            "/api/testing-centers/applications",
            "/api/testing-centers",
        ))
}

fn center_routes(kind: CenterKind, applications: &str, directory: &str) -> Router<PortalState> {
    Router::new()
        .route(
            applications,
            get(
                move |service: Service,
                      actor: Actor,
                      QueryParams(filter): QueryParams<ListFilter>| {
                    list_handler(kind, service, actor, filter)
                },
            )
            .post(
                move |service: Service,
                      actor: Actor,
                      JsonBody(form): JsonBody<ApplicationForm>| {
                    submit_handler(kind, service, actor, form)
                },
            ),
        )
        .route(
            &format!("{applications}/:application_id"),
            get(
                move |service: Service, actor: Actor, Path(id): Path<String>| {
                    get_handler(kind, service, actor, id)
                },
            )
            .patch(
                move |service: Service,
                      actor: Actor,
                      Path(id): Path<String>,
                      JsonBody(form): JsonBody<ApplicationForm>| {
                    edit_handler(kind, service, actor, id, form)
                },
            ),
        )
        .route(
            &format!("{applications}/:application_id/status"),
            patch(
                move |service: Service,
                      actor: Actor,
                      Path(id): Path<String>,
                      JsonBody(update): JsonBody<StatusUpdate>| {
                    status_handler(kind, service, actor, id, update)
                },
            ),
        )
        .route(
            &format!("{applications}/:application_id/certificate"),
            get(
                move |service: Service, actor: Actor, Path(id): Path<String>| {
                    certificate_handler(kind, service, actor, id)
                },
            ),
        )
        .route(
            directory,
            get(
                move |service: Service, QueryParams(filter): QueryParams<ListFilter>| {
                    directory_handler(kind, service, filter)
                },
            ),
        )
        .route(
            &format!("{directory}/stats"),
            get(move |service: Service, actor: Actor| stats_handler(kind, service, actor)),
        )
}

pub(crate) async fn list_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    filter: ListFilter,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    let records = service.list(kind, &actor, &filter)?;
    Ok(Json(
        records.into_iter().map(|record| record.view()).collect(),
    ))
}

pub(crate) async fn submit_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    form: ApplicationForm,
) -> Result<impl IntoResponse, AppError> {
    let record = service.submit(kind, &actor, form)?;
    Ok((StatusCode::CREATED, Json(record.view())))
}

pub(crate) async fn get_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    id: String,
) -> Result<Json<ApplicationView>, AppError> {
    let record = service.get(kind, &actor, &ApplicationId(id))?;
    Ok(Json(record.view()))
}

pub(crate) async fn edit_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    id: String,
    form: ApplicationForm,
) -> Result<Json<ApplicationView>, AppError> {
    let record = service.edit(kind, &actor, &ApplicationId(id), form)?;
    Ok(Json(record.view()))
}

pub(crate) async fn status_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    id: String,
    update: StatusUpdate,
) -> Result<Json<ApplicationView>, AppError> {
    let record = service.update_status(kind, &actor, &ApplicationId(id), update)?;
    Ok(Json(record.view()))
}

pub(crate) async fn certificate_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
    id: String,
) -> Result<Json<Certificate>, AppError> {
    Ok(Json(service.certificate(kind, &actor, &ApplicationId(id))?))
}

pub(crate) async fn directory_handler(
    kind: CenterKind,
    State(service): Service,
    filter: ListFilter,
) -> Result<Json<Vec<CenterSummary>>, AppError> {
    Ok(Json(service.centers(kind, &filter)?))
}

pub(crate) async fn stats_handler(
    kind: CenterKind,
    State(service): Service,
    actor: Actor,
) -> Result<Json<ApplicationStats>, AppError> {
    Ok(Json(service.stats(kind, &actor)?))
}

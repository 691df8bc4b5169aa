use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::portal::applications::router::submit_handler;
use crate::portal::applications::{ApplicationService, CenterKind};
use crate::portal::certificates::CertificateService;
use crate::portal::memory::InMemoryCertificateRepository;
use crate::portal::{router, PortalState};

fn portal() -> axum::Router {
    router(PortalState::in_memory(std::env::temp_dir()))
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_repository_failure() {
    let certificates = Arc::new(CertificateService::new(Arc::new(
        InMemoryCertificateRepository::default(),
    )));
    let service = Arc::new(ApplicationService::new(
        Arc::new(UnavailableRepository),
        certificates,
    ));

    let response = submit_handler(
        CenterKind::TrainingCenter,
        State(service),
        trainer("center-1"),
        form("Al Noor", "Riyadh"),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert_eq!(body["message"], "an internal error occurred");
}

#[tokio::test]
async fn submit_route_creates_training_application() {
    let response = portal()
        .oneshot(request(
            "POST",
            "/api/training-center-applications",
            Some(&trainer("center-1")),
            Some(json!(form("Al Noor", "Riyadh"))),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "تحت المراجعة");
    assert_eq!(body["center_name"], "Al Noor");
    assert_eq!(body["can_edit"], true);
    assert_eq!(body["badge"]["label"], "تحت المراجعة");
}

#[tokio::test]
async fn missing_identity_headers_are_unauthorized() {
    let response = portal()
        .oneshot(request(
            "POST",
            "/api/testing-centers/applications",
            None,
            Some(json!(form("Safe Roads", "Makkah"))),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn reviewer_flow_over_http_issues_certificate() {
    let app = portal();
    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/testing-centers/applications",
            Some(&tester("tc-1")),
            Some(json!(form("Safe Roads", "Makkah"))),
        ))
        .await
        .expect("router responds");
    let id = read_json_body(created).await["id"]
        .as_str()
        .expect("id")
        .to_string();

    let skipped = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/api/testing-centers/applications/{id}/status"),
            Some(&admin()),
            Some(json!({ "status": "مقبول" })),
        ))
        .await
        .expect("router responds");
    assert_eq!(skipped.status(), StatusCode::BAD_REQUEST);

    for status in ["زيارة ميدانية", "تحت التقييم", "مقبول"] {
        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/api/testing-centers/applications/{id}/status"),
                Some(&admin()),
                Some(json!({ "status": status })),
            ))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK, "moving to {status}");
    }

    let edit = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/api/testing-centers/applications/{id}"),
            Some(&tester("tc-1")),
            Some(json!(form("Renamed", "Makkah"))),
        ))
        .await
        .expect("router responds");
    assert_eq!(edit.status(), StatusCode::CONFLICT);

    let certificate = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/testing-centers/applications/{id}/certificate"),
            Some(&tester("tc-1")),
            None,
        ))
        .await
        .expect("router responds");
    assert_eq!(certificate.status(), StatusCode::OK);
    let body = read_json_body(certificate).await;
    assert!(body["certificate_number"]
        .as_str()
        .expect("number")
        .starts_with("DC-"));

    let directory = app
        .oneshot(request("GET", "/api/testing-centers?region=Makkah", None, None))
        .await
        .expect("router responds");
    assert_eq!(directory.status(), StatusCode::OK);
    let centers = read_json_body(directory).await;
    assert_eq!(centers.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn stats_route_is_forbidden_for_centers() {
    let response = portal()
        .oneshot(request(
            "GET",
            "/api/training-centers/stats",
            Some(&trainer("center-1")),
            None,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

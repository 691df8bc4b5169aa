//! End-to-end portal scenarios driven through the public HTTP router: accreditation, courses,
//! exams, certificate matching, certificates, and uploads.

mod common {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use drivecert::portal::access::{USER_ID_HEADER, USER_ROLE_HEADER};
    use drivecert::portal::{router, PortalState};

    pub(super) struct Portal {
        app: Router,
    }

    impl Portal {
        pub(super) fn new(upload_dir: &std::path::Path) -> Self {
            Self {
                app: router(PortalState::in_memory(upload_dir)),
            }
        }

        pub(super) async fn send(
            &self,
            method: &str,
            uri: &str,
            caller: Option<(&str, &str)>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let response = self
                .app
                .clone()
                .oneshot(build_request(method, uri, caller, body))
                .await
                .expect("router responds");
            let status = response.status();
            (status, read_body(response).await)
        }

        pub(super) async fn raw(&self, uri: &str) -> Response {
            self.app
                .clone()
                .oneshot(build_request("GET", uri, None, None))
                .await
                .expect("router responds")
        }

        /// Submit and accept an accreditation application for `center`.
        pub(super) async fn accredit(&self, applications: &str, center: (&str, &str)) -> Value {
            let (status, created) = self
                .send("POST", applications, Some(center), Some(application_form(center.0)))
                .await;
            assert_eq!(status, StatusCode::CREATED, "{created}");
            let id = created["id"].as_str().expect("application id").to_string();

            let mut last = Value::Null;
            for next in ["زيارة ميدانية", "تحت التقييم", "مقبول"] {
                let (status, body) = self
                    .send(
                        "PATCH",
                        &format!("{applications}/{id}/status"),
                        Some(ADMIN),
                        Some(json!({ "status": next, "review_notes": "ok" })),
                    )
                    .await;
                assert_eq!(status, StatusCode::OK, "{body}");
                last = body;
            }
            last
        }
    }

    pub(super) const ADMIN: (&str, &str) = ("admin-1", "admin");
    pub(super) const TRAINER: (&str, &str) = ("center-1", "training_center");
    pub(super) const TESTER: (&str, &str) = ("tc-1", "testing_center");

    pub(super) fn student(id: &str) -> (&str, &str) {
        (id, "student")
    }

    pub(super) fn application_form(name: &str) -> Value {
        json!({
            "center_name": format!("Center {name}"),
            "region": "Riyadh",
            "city": "Riyadh",
            "commercial_registration": "1010123456",
            "contact_email": "info@center.example",
            "contact_phone": "+966500000000",
            "documents": ["license.pdf"]
        })
    }

    pub(super) fn course_form(title: &str, capacity: u32) -> Value {
        json!({
            "title": title,
            "description": "Theory and yard practice",
            "duration_hours": 30,
            "capacity": capacity,
            "start_date": "2026-11-01",
            "end_date": "2026-11-20",
            "location": "Riyadh",
            "metadata": { "instructor": "Khalid" }
        })
    }

    pub(super) fn exam_form(title: &str, capacity: u32) -> Value {
        json!({
            "title": title,
            "exam_type": "practical",
            "exam_date": "2026-12-05",
            "location": "Riyadh",
            "capacity": capacity
        })
    }

    fn build_request(
        method: &str,
        uri: &str,
        caller: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = caller {
            builder = builder
                .header(USER_ID_HEADER, id)
                .header(USER_ROLE_HEADER, role);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).expect("serialize"))
            }
            None => Body::empty(),
        };
        builder.body(body).expect("request")
    }

    async fn read_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("read body");
        if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json payload")
        }
    }
}

use axum::http::{header, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn course_creation_waits_for_accreditation() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());

    let (status, body) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(course_form("Basics", 5)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CENTER_NOT_APPROVED");

    let accepted = portal
        .accredit("/api/training-center-applications", TRAINER)
        .await;
    assert_eq!(accepted["status"], "مقبول");
    assert!(accepted["certificate_id"].is_string());

    let (status, body) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(course_form("Basics", 5)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "مجدولة");
    assert_eq!(body["seats_left"], 5);
}

#[tokio::test]
async fn only_scheduled_courses_accept_registrations() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());
    portal
        .accredit("/api/training-center-applications", TRAINER)
        .await;

    let (_, open) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(course_form("Open", 5)))
        .await;
    let (_, cancelled) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(course_form("Cancelled", 5)))
        .await;
    let open_id = open["id"].as_str().expect("id").to_string();
    let cancelled_id = cancelled["id"].as_str().expect("id").to_string();

    let (status, _) = portal
        .send(
            "PATCH",
            &format!("/api/courses/{cancelled_id}"),
            Some(TRAINER),
            Some(json!({ "status": "ملغاة" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = portal
        .send(
            "POST",
            &format!("/api/courses/{open_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = portal
        .send(
            "POST",
            &format!("/api/courses/{cancelled_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = portal
        .send(
            "POST",
            &format!("/api/courses/{open_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_REGISTERED");

    let (status, listed) = portal
        .send("GET", "/api/courses?status=%D9%85%D9%84%D8%BA%D8%A7%D8%A9", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["can_register"], false);
}

#[tokio::test]
async fn completed_enrollment_exposes_certificate_to_the_student() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());
    portal
        .accredit("/api/training-center-applications", TRAINER)
        .await;
    let (_, course) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(course_form("Basics", 2)))
        .await;
    let course_id = course["id"].as_str().expect("id").to_string();

    let (_, enrollment) = portal
        .send(
            "POST",
            &format!("/api/courses/{course_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    let enrollment_id = enrollment["id"].as_str().expect("id").to_string();
    assert!(enrollment["certificate"].is_null());

    let (status, roster) = portal
        .send(
            "GET",
            &format!("/api/courses/{course_id}/enrollments"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{roster}");

    let (status, completed) = portal
        .send(
            "PATCH",
            &format!("/api/enrollments/{enrollment_id}"),
            Some(TRAINER),
            Some(json!({ "status": "مكتمل" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{completed}");
    let certificate_id = completed["certificate"]["id"]
        .as_str()
        .expect("certificate issued")
        .to_string();

    let (status, history) = portal
        .send(
            "GET",
            "/api/students/s-1/enrollments",
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["certificate"]["id"], certificate_id.as_str());

    let (status, certificate) = portal
        .send(
            "GET",
            &format!("/api/certificates/{certificate_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(certificate["owner"]["kind"], "enrollment");

    let (status, mine) = portal
        .send("GET", "/api/certificates", Some(student("s-1")), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let (status, _) = portal
        .send(
            "GET",
            "/api/certificates?holder=s-1",
            Some(student("s-2")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = portal
        .send(
            "DELETE",
            &format!("/api/courses/{course_id}"),
            Some(TRAINER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn exam_registration_result_and_certificate() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());
    portal
        .accredit("/api/testing-centers/applications", TESTER)
        .await;

    let (status, exam) = portal
        .send("POST", "/api/exams", Some(TESTER), Some(exam_form("Road test", 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{exam}");
    assert_eq!(exam["status"], "مجدول");
    assert_eq!(exam["is_visible"], true);
    let exam_id = exam["id"].as_str().expect("id").to_string();

    let (status, registration) = portal
        .send(
            "POST",
            &format!("/api/exams/{exam_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let registration_id = registration["id"].as_str().expect("id").to_string();

    let (status, body) = portal
        .send(
            "POST",
            &format!("/api/exams/{exam_id}/register"),
            Some(student("s-2")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_REACHED");

    let (status, candidates) = portal
        .send(
            "GET",
            &format!("/api/exams/{exam_id}/candidates"),
            Some(TESTER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(candidates.as_array().map(Vec::len), Some(1));

    let (status, passed) = portal
        .send(
            "PATCH",
            &format!("/api/exam-registrations/{registration_id}/result"),
            Some(TESTER),
            Some(json!({ "result": "ناجح", "notes": "clean drive" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{passed}");
    assert_eq!(passed["status"], "حاضر");
    assert_eq!(passed["certificate"]["owner"]["kind"], "exam_registration");

    let (status, _) = portal
        .send(
            "DELETE",
            &format!("/api/exams/{exam_id}/register"),
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, mine) = portal
        .send(
            "GET",
            "/api/students/s-1/exam-registrations",
            Some(student("s-1")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["result"], "ناجح");
}

#[tokio::test]
async fn hidden_exams_stay_out_of_public_listings() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());
    portal
        .accredit("/api/testing-centers/applications", TESTER)
        .await;

    let mut hidden = exam_form("Private session", 10);
    hidden["is_visible"] = json!(false);
    let (_, hidden) = portal
        .send("POST", "/api/exams", Some(TESTER), Some(hidden))
        .await;
    let hidden_id = hidden["id"].as_str().expect("id").to_string();

    let (_, public) = portal.send("GET", "/api/exams", None, None).await;
    assert_eq!(public.as_array().map(Vec::len), Some(0));

    let (_, owned) = portal.send("GET", "/api/exams", Some(TESTER), None).await;
    assert_eq!(owned.as_array().map(Vec::len), Some(1));

    let (status, _) = portal
        .send(
            "PATCH",
            &format!("/api/exams/{hidden_id}"),
            Some(TESTER),
            Some(json!({ "is_visible": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, public) = portal
        .send("GET", "/api/exams", Some(student("s-1")), None)
        .await;
    assert_eq!(public.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn certificate_matching_review() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());

    let (status, request) = portal
        .send(
            "POST",
            "/api/certificate-matching",
            Some(student("s-1")),
            Some(json!({
                "student_name": "Sara Ahmed",
                "institution": "Gulf Driving School",
                "certificate_title": "Light vehicle license course",
                "issued_on": "2025-06-01",
                "certificate_file": "sara-certificate.pdf"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(request["status"], "تم تقديم الطلب");
    let id = request["id"].as_str().expect("id").to_string();

    let (status, _) = portal
        .send(
            "PATCH",
            &format!("/api/certificate-matching/{id}/status"),
            Some(ADMIN),
            Some(json!({ "status": "غير مطابقة" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, decided) = portal
        .send(
            "PATCH",
            &format!("/api/certificate-matching/{id}/status"),
            Some(ADMIN),
            Some(json!({ "status": "مطابقة", "review_notes": "equivalent" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["can_edit"], false);

    let (status, others) = portal
        .send(
            "GET",
            "/api/certificate-matching",
            Some(student("s-2")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(others.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn uploads_are_served_with_guessed_content_type() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("license.pdf"), b"%PDF-1.7").expect("write upload");
    let portal = Portal::new(dir.path());

    let response = portal.raw("/api/uploads/license.pdf").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/pdf")
    );

    let root_link = portal.raw("/license.pdf").await;
    assert_eq!(root_link.status(), StatusCode::OK);

    let missing = portal.raw("/api/uploads/missing.pdf").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let traversal = portal.raw("/api/uploads/..%2F.env").await;
    assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_payloads_answer_with_validation_errors() {
    let dir = tempfile::tempdir().expect("temp dir");
    let portal = Portal::new(dir.path());

    let (status, created) = portal
        .send(
            "POST",
            "/api/training-center-applications",
            Some(TRAINER),
            Some(application_form("center-1")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().expect("application id").to_string();

    let (status, body) = portal
        .send(
            "PATCH",
            &format!("/api/training-center-applications/{id}/status"),
            Some(ADMIN),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().expect("message").contains("approved"));

    let mut form = course_form("Basics", 5);
    form["capacity"] = json!("five");
    let (status, body) = portal
        .send("POST", "/api/courses", Some(TRAINER), Some(form))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

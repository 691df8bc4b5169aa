use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use drivecert::error::AppError;
use drivecert::portal::applications::{ApplicationForm, CenterKind, StatusUpdate};
use drivecert::portal::courses::{CourseForm, EnrollmentUpdate};
use drivecert::portal::exams::{ExamForm, ResultUpdate};
use drivecert::portal::ids::ApplicationId;
use drivecert::portal::status::{EnrollmentStatus, ExamResult, ReviewStatus, WorkflowStatus};
use drivecert::portal::{Actor, ListFilter, PortalState, Role};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seats offered on the demo course
    #[arg(long, default_value_t = 2)]
    pub(crate) seats: u32,
    /// Number of students trying to enroll
    #[arg(long, default_value_t = 3)]
    pub(crate) students: u32,
    /// First day of the demo course (YYYY-MM-DD). Defaults to two weeks from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Region recorded on the demo applications
    #[arg(long, default_value = "الرياض")]
    pub(crate) region: String,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seats,
        students,
        start_date,
        region,
    } = args;
    let start_date = start_date.unwrap_or_else(|| Local::now().date_naive() + Duration::days(14));

    let portal = PortalState::in_memory(PathBuf::from("./uploads"));
    let admin = Actor::new("admin-demo", Role::Admin);
    let trainer = Actor::new("training-center-demo", Role::TrainingCenter);
    let tester = Actor::new("testing-center-demo", Role::TestingCenter);

    println!("Driver-training portal demo");

    println!("\nAccreditation");
    for (kind, center, name) in [
        (CenterKind::TrainingCenter, &trainer, "مركز النور للتدريب"),
        (CenterKind::TestingCenter, &tester, "مركز الطريق الآمن للاختبار"),
    ] {
        let submitted = portal
            .applications
            .submit(kind, center, application_form(name, &region))?;
        println!(
            "  {} submitted {} ({})",
            center.id,
            submitted.id,
            submitted.status.label()
        );
        accept(&portal, &admin, kind, &submitted.id)?;
        let certificate = portal.applications.certificate(kind, center, &submitted.id)?;
        println!(
            "  {} accepted; certificate {}",
            submitted.id, certificate.certificate_number
        );
    }

    println!("\nCourse enrollment");
    let course = portal.courses.create(
        &trainer,
        CourseForm {
            title: "رخصة القيادة الخاصة".to_string(),
            description: "Theory sessions followed by yard practice".to_string(),
            duration_hours: 30,
            capacity: seats,
            start_date,
            end_date: start_date + Duration::days(20),
            location: region.clone(),
            metadata: serde_json::json!({ "instructor": "Khalid" }),
        },
    )?;
    println!(
        "  {} '{}' with {} seats",
        course.course.id, course.course.form.title, course.seats_left
    );

    let mut first_enrollment = None;
    for n in 1..=students {
        let student = Actor::new(format!("student-{n}"), Role::Student);
        match portal.courses.register(&student, &course.course.id) {
            Ok(view) => {
                println!("  {} enrolled ({})", student.id, view.badge.label);
                if first_enrollment.is_none() {
                    first_enrollment = Some(view.enrollment.id);
                }
            }
            Err(err) => println!("  {} refused: {err}", student.id),
        }
    }

    if let Some(enrollment_id) = first_enrollment {
        let completed = portal.courses.update_enrollment(
            &trainer,
            &enrollment_id,
            EnrollmentUpdate {
                status: EnrollmentStatus::Completed,
            },
        )?;
        if let Some(certificate) = completed.certificate {
            println!(
                "  {} completed the course; certificate {}",
                completed.enrollment.student_id, certificate.certificate_number
            );
        }
    }

    println!("\nExam");
    let exam = portal.exams.create(
        &tester,
        ExamForm {
            title: "اختبار القيادة العملي".to_string(),
            description: String::new(),
            exam_type: "practical".to_string(),
            exam_date: start_date + Duration::days(30),
            location: region.clone(),
            capacity: seats,
            is_visible: true,
        },
    )?;
    let candidate = Actor::new("student-1", Role::Student);
    let registration = portal.exams.register(&candidate, &exam.exam.id)?;
    println!(
        "  {} registered for {} ({})",
        candidate.id, exam.exam.id, registration.badge.label
    );
    let graded = portal.exams.record_result(
        &tester,
        &registration.registration.id,
        ResultUpdate {
            result: Some(ExamResult::Passed),
            notes: Some("clean drive".to_string()),
            ..ResultUpdate::default()
        },
    )?;
    if let Some(certificate) = graded.certificate {
        println!(
            "  {} passed; certificate {}",
            candidate.id, certificate.certificate_number
        );
    }

    println!("\nSummary");
    let stats = portal.applications.stats(CenterKind::TrainingCenter, &admin)?;
    println!("  training applications: {}", stats.total);
    let centers = portal
        .applications
        .centers(CenterKind::TrainingCenter, &ListFilter::by_region(region))?;
    println!("  accredited training centers in region: {}", centers.len());
    for certificate in portal.certificates.list(&admin, None)? {
        println!(
            "  {} -> {} ({})",
            certificate.certificate_number, certificate.holder_id, certificate.title
        );
    }

    Ok(())
}

fn application_form(name: &str, region: &str) -> ApplicationForm {
    ApplicationForm {
        center_name: name.to_string(),
        region: region.to_string(),
        city: region.to_string(),
        commercial_registration: "1010123456".to_string(),
        contact_email: "info@center.example".to_string(),
        contact_phone: "+966500000000".to_string(),
        documents: Vec::new(),
    }
}

fn accept(
    portal: &PortalState,
    admin: &Actor,
    kind: CenterKind,
    id: &ApplicationId,
) -> Result<(), AppError> {
    for status in [
        ReviewStatus::FieldVisit,
        ReviewStatus::UnderEvaluation,
        ReviewStatus::Accepted,
    ] {
        portal.applications.update_status(
            kind,
            admin,
            id,
            StatusUpdate {
                status,
                review_notes: None,
            },
        )?;
    }
    Ok(())
}

//! Training courses published by accredited training centers, and student enrollments.

mod repository;
mod router;
mod service;

pub use repository::CourseRepository;
pub use router::routes;
pub use service::CourseService;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::certificates::Certificate;
use super::filters::Filterable;
use super::ids::{CertificateId, CourseId, EnrollmentId, UserId};
use super::status::{Badge, CourseStatus, EnrollmentStatus, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CourseForm {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(range(min = 1, max = 2000))]
    pub duration_hours: u32,
    #[validate(range(min = 1, max = 1000))]
    pub capacity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 2, max = 200))]
    pub location: String,
    /// Free-form details such as objectives, instructor, and requirements.
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub training_center_id: UserId,
    #[serde(flatten)]
    pub form: CourseForm,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Course {
    fn status_label(&self) -> &str {
        self.status.label()
    }

    fn search_text(&self) -> Vec<&str> {
        vec![
            self.form.title.as_str(),
            self.form.location.as_str(),
            self.form.description.as_str(),
        ]
    }

    fn center(&self) -> Option<&str> {
        Some(self.training_center_id.as_str())
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_hours: Option<u32>,
    pub capacity: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub metadata: Option<Value>,
    pub status: Option<CourseStatus>,
}

impl CoursePatch {
    pub(crate) fn touches_details(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.duration_hours.is_some()
            || self.capacity.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.location.is_some()
            || self.metadata.is_some()
    }

    pub(crate) fn apply_to(self, form: &mut CourseForm) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(duration_hours) = self.duration_hours {
            form.duration_hours = duration_hours;
        }
        if let Some(capacity) = self.capacity {
            form.capacity = capacity;
        }
        if let Some(start_date) = self.start_date {
            form.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            form.end_date = end_date;
        }
        if let Some(location) = self.location {
            form.location = location;
        }
        if let Some(metadata) = self.metadata {
            form.metadata = metadata;
        }
    }
}

/// Course with live seat accounting.
#[derive(Debug, Clone, Serialize)]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub enrolled_count: u32,
    pub seats_left: u32,
    pub can_register: bool,
    pub badge: Badge,
}

impl CourseView {
    pub(crate) fn new(course: Course, enrolled_count: u32) -> Self {
        let seats_left = course.form.capacity.saturating_sub(enrolled_count);
        Self {
            can_register: course.status == CourseStatus::Scheduled && seats_left > 0,
            badge: course.status.badge(),
            enrolled_count,
            seats_left,
            course,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    pub student_id: UserId,
    pub status: EnrollmentStatus,
    pub enrollment_date: DateTime<Utc>,
    pub certificate_id: Option<CertificateId>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course_title: String,
    pub badge: Badge,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnrollmentUpdate {
    pub status: EnrollmentStatus,
}

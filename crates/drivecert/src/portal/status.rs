//! Closed status vocabularies and their transition graphs.
//!
//! Every status travels over the wire as its Arabic label. Transitions outside the graph are
//! rejected, and a transition to the current status is never a valid move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::PortalError;
use super::ids::UserId;

/// Visual tone of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Info,
    Warning,
    Success,
    Danger,
}

/// Tone and icon rendered next to a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub tone: BadgeTone,
    pub icon: &'static str,
}

pub trait WorkflowStatus: Copy + Eq + std::fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
    fn can_transition_to(self, next: Self) -> bool;
    fn badge(self) -> Badge;

    fn is_terminal(self) -> bool {
        !Self::ALL.iter().any(|next| self.can_transition_to(*next))
    }

    fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|status| status.label() == raw)
    }
}

/// Validate `from -> to` against the status graph and return the new status.
pub fn transition<S: WorkflowStatus>(from: S, to: S) -> Result<S, PortalError> {
    if from != to && from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(PortalError::InvalidTransition {
            from: from.label(),
            to: to.label(),
        })
    }
}

fn unknown_label(kind: &str, raw: &str) -> PortalError {
    PortalError::Validation(format!("unknown {kind} '{}'", raw.trim()))
}

macro_rules! parse_from_label {
    ($($status:ty => $kind:literal),+ $(,)?) => {
        $(
            impl std::str::FromStr for $status {
                type Err = PortalError;

                fn from_str(raw: &str) -> Result<Self, Self::Err> {
                    <$status as WorkflowStatus>::from_label(raw)
                        .ok_or_else(|| unknown_label($kind, raw))
                }
            }
        )+
    };
}

parse_from_label! {
    ReviewStatus => "review status",
    MatchingStatus => "matching status",
    CourseStatus => "course status",
    ExamStatus => "exam status",
    EnrollmentStatus => "enrollment status",
    RegistrationStatus => "registration status",
}

/// Audit entry appended whenever a record changes status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<S>,
    pub to: S,
    pub actor: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

const fn badge(label: &'static str, tone: BadgeTone, icon: &'static str) -> Badge {
    Badge { label, tone, icon }
}

/// Review state of a training-center or testing-center application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "تحت المراجعة")]
    UnderReview,
    #[serde(rename = "زيارة ميدانية")]
    FieldVisit,
    #[serde(rename = "تحت التقييم")]
    UnderEvaluation,
    #[serde(rename = "مقبول")]
    Accepted,
    #[serde(rename = "مرفوض")]
    Rejected,
}

impl ReviewStatus {
    /// Applicants may only edit while the application waits for review or after a rejection.
    pub const fn allows_edit(self) -> bool {
        matches!(self, ReviewStatus::UnderReview | ReviewStatus::Rejected)
    }
}

impl WorkflowStatus for ReviewStatus {
    const ALL: &'static [Self] = &[
        ReviewStatus::UnderReview,
        ReviewStatus::FieldVisit,
        ReviewStatus::UnderEvaluation,
        ReviewStatus::Accepted,
        ReviewStatus::Rejected,
    ];

    fn label(self) -> &'static str {
        match self {
            ReviewStatus::UnderReview => "تحت المراجعة",
            ReviewStatus::FieldVisit => "زيارة ميدانية",
            ReviewStatus::UnderEvaluation => "تحت التقييم",
            ReviewStatus::Accepted => "مقبول",
            ReviewStatus::Rejected => "مرفوض",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (UnderReview, FieldVisit)
                | (UnderReview, UnderEvaluation)
                | (UnderReview, Rejected)
                | (FieldVisit, UnderEvaluation)
                | (FieldVisit, Rejected)
                | (UnderEvaluation, Accepted)
                | (UnderEvaluation, Rejected)
        )
    }

    fn badge(self) -> Badge {
        match self {
            ReviewStatus::UnderReview => badge(self.label(), BadgeTone::Warning, "clock"),
            ReviewStatus::FieldVisit => badge(self.label(), BadgeTone::Info, "map-pin"),
            ReviewStatus::UnderEvaluation => badge(self.label(), BadgeTone::Info, "clipboard"),
            ReviewStatus::Accepted => badge(self.label(), BadgeTone::Success, "check-circle"),
            ReviewStatus::Rejected => badge(self.label(), BadgeTone::Danger, "x-circle"),
        }
    }
}

/// State of a certificate matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchingStatus {
    #[serde(rename = "تم تقديم الطلب")]
    Submitted,
    #[serde(rename = "تحت المراجعة")]
    UnderReview,
    #[serde(rename = "مطابقة")]
    Matched,
    #[serde(rename = "غير مطابقة")]
    NotMatched,
}

impl MatchingStatus {
    pub const fn allows_edit(self) -> bool {
        matches!(self, MatchingStatus::Submitted)
    }
}

impl WorkflowStatus for MatchingStatus {
    const ALL: &'static [Self] = &[
        MatchingStatus::Submitted,
        MatchingStatus::UnderReview,
        MatchingStatus::Matched,
        MatchingStatus::NotMatched,
    ];

    fn label(self) -> &'static str {
        match self {
            MatchingStatus::Submitted => "تم تقديم الطلب",
            MatchingStatus::UnderReview => "تحت المراجعة",
            MatchingStatus::Matched => "مطابقة",
            MatchingStatus::NotMatched => "غير مطابقة",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        use MatchingStatus::*;
        matches!(
            (self, next),
            (Submitted, UnderReview)
                | (Submitted, Matched)
                | (Submitted, NotMatched)
                | (UnderReview, Matched)
                | (UnderReview, NotMatched)
        )
    }

    fn badge(self) -> Badge {
        match self {
            MatchingStatus::Submitted => badge(self.label(), BadgeTone::Neutral, "send"),
            MatchingStatus::UnderReview => badge(self.label(), BadgeTone::Warning, "clock"),
            MatchingStatus::Matched => badge(self.label(), BadgeTone::Success, "check-circle"),
            MatchingStatus::NotMatched => badge(self.label(), BadgeTone::Danger, "x-circle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseStatus {
    #[serde(rename = "مجدولة")]
    Scheduled,
    #[serde(rename = "قيد التنفيذ")]
    InProgress,
    #[serde(rename = "مكتملة", alias = "منتهية")]
    Completed,
    #[serde(rename = "ملغاة")]
    Cancelled,
}

impl WorkflowStatus for CourseStatus {
    const ALL: &'static [Self] = &[
        CourseStatus::Scheduled,
        CourseStatus::InProgress,
        CourseStatus::Completed,
        CourseStatus::Cancelled,
    ];

    fn label(self) -> &'static str {
        match self {
            CourseStatus::Scheduled => "مجدولة",
            CourseStatus::InProgress => "قيد التنفيذ",
            CourseStatus::Completed => "مكتملة",
            CourseStatus::Cancelled => "ملغاة",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        use CourseStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    fn badge(self) -> Badge {
        match self {
            CourseStatus::Scheduled => badge(self.label(), BadgeTone::Info, "calendar"),
            CourseStatus::InProgress => badge(self.label(), BadgeTone::Warning, "play"),
            CourseStatus::Completed => badge(self.label(), BadgeTone::Success, "check-circle"),
            CourseStatus::Cancelled => badge(self.label(), BadgeTone::Danger, "slash"),
        }
    }

    fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "منتهية" => Some(CourseStatus::Completed),
            other => Self::ALL
                .iter()
                .copied()
                .find(|status| status.label() == other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamStatus {
    #[serde(rename = "مجدول")]
    Scheduled,
    #[serde(rename = "جاري")]
    InProgress,
    #[serde(rename = "منتهي")]
    Finished,
    #[serde(rename = "ملغى")]
    Cancelled,
}

impl WorkflowStatus for ExamStatus {
    const ALL: &'static [Self] = &[
        ExamStatus::Scheduled,
        ExamStatus::InProgress,
        ExamStatus::Finished,
        ExamStatus::Cancelled,
    ];

    fn label(self) -> &'static str {
        match self {
            ExamStatus::Scheduled => "مجدول",
            ExamStatus::InProgress => "جاري",
            ExamStatus::Finished => "منتهي",
            ExamStatus::Cancelled => "ملغى",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ExamStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (InProgress, Finished)
                | (InProgress, Cancelled)
        )
    }

    fn badge(self) -> Badge {
        match self {
            ExamStatus::Scheduled => badge(self.label(), BadgeTone::Info, "calendar"),
            ExamStatus::InProgress => badge(self.label(), BadgeTone::Warning, "play"),
            ExamStatus::Finished => badge(self.label(), BadgeTone::Success, "flag"),
            ExamStatus::Cancelled => badge(self.label(), BadgeTone::Danger, "slash"),
        }
    }
}

/// State of a student's course enrollment. `Completed` is the accepted terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    #[serde(rename = "مسجل")]
    Registered,
    #[serde(rename = "مكتمل")]
    Completed,
    #[serde(rename = "منسحب")]
    Withdrawn,
}

impl EnrollmentStatus {
    /// Whether the enrollment still occupies a seat.
    pub const fn holds_seat(self) -> bool {
        !matches!(self, EnrollmentStatus::Withdrawn)
    }
}

impl WorkflowStatus for EnrollmentStatus {
    const ALL: &'static [Self] = &[
        EnrollmentStatus::Registered,
        EnrollmentStatus::Completed,
        EnrollmentStatus::Withdrawn,
    ];

    fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Registered => "مسجل",
            EnrollmentStatus::Completed => "مكتمل",
            EnrollmentStatus::Withdrawn => "منسحب",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (EnrollmentStatus::Registered, EnrollmentStatus::Completed)
                | (EnrollmentStatus::Registered, EnrollmentStatus::Withdrawn)
        )
    }

    fn badge(self) -> Badge {
        match self {
            EnrollmentStatus::Registered => badge(self.label(), BadgeTone::Info, "user-check"),
            EnrollmentStatus::Completed => badge(self.label(), BadgeTone::Success, "award"),
            EnrollmentStatus::Withdrawn => badge(self.label(), BadgeTone::Neutral, "log-out"),
        }
    }
}

/// Attendance state of an exam registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    #[serde(rename = "مسجل")]
    Registered,
    #[serde(rename = "حاضر")]
    Attended,
    #[serde(rename = "غائب")]
    Absent,
}

impl WorkflowStatus for RegistrationStatus {
    const ALL: &'static [Self] = &[
        RegistrationStatus::Registered,
        RegistrationStatus::Attended,
        RegistrationStatus::Absent,
    ];

    fn label(self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "مسجل",
            RegistrationStatus::Attended => "حاضر",
            RegistrationStatus::Absent => "غائب",
        }
    }

    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (RegistrationStatus::Registered, RegistrationStatus::Attended)
                | (RegistrationStatus::Registered, RegistrationStatus::Absent)
                | (RegistrationStatus::Absent, RegistrationStatus::Attended)
        )
    }

    fn badge(self) -> Badge {
        match self {
            RegistrationStatus::Registered => badge(self.label(), BadgeTone::Info, "user-check"),
            RegistrationStatus::Attended => badge(self.label(), BadgeTone::Success, "check"),
            RegistrationStatus::Absent => badge(self.label(), BadgeTone::Danger, "user-x"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamResult {
    #[serde(rename = "ناجح")]
    Passed,
    #[serde(rename = "راسب")]
    Failed,
}

impl ExamResult {
    pub const fn label(self) -> &'static str {
        match self {
            ExamResult::Passed => "ناجح",
            ExamResult::Failed => "راسب",
        }
    }

    pub const fn badge(self) -> Badge {
        match self {
            ExamResult::Passed => badge(self.label(), BadgeTone::Success, "award"),
            ExamResult::Failed => badge(self.label(), BadgeTone::Danger, "x-circle"),
        }
    }
}

impl std::str::FromStr for ExamResult {
    type Err = PortalError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        [ExamResult::Passed, ExamResult::Failed]
            .into_iter()
            .find(|result| result.label() == raw.trim())
            .ok_or_else(|| unknown_label("exam result", raw))
    }
}

//! Accreditation applications submitted by prospective training and testing centers.
//!
//! An application moves through review (`تحت المراجعة` → `زيارة ميدانية` → `تحت التقييم` →
//! `مقبول`/`مرفوض`). Acceptance issues the center's accreditation certificate and opens the
//! approval gate that course and exam creation depend on.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationForm, ApplicationRecord, ApplicationStats, ApplicationView, CenterKind,
    CenterSummary, StatusUpdate,
};
pub use repository::ApplicationRepository;
pub use router::routes;
pub use service::{ApplicationService, ApprovalGate};

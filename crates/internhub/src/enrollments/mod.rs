//! Enrollment back-fill for approved internship applications.
//!
//! The reconciler walks every approved application, resolves the active course it names,
//! and creates the missing enrollment. Stores are pluggable through [`EnrollmentStore`];
//! progress reporting is pluggable through [`ReconcileObserver`].

pub mod domain;
pub mod observer;
pub mod reconciler;
pub mod repository;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, Course, CourseId, CourseStatus, Enrollment,
    EnrollmentId, EnrollmentStatus, NewEnrollment, UserId, DEFAULT_ENROLLMENT_TIMEZONE,
};
pub use observer::{ReconcileEvent, ReconcileObserver, SilentObserver, TracingObserver};
pub use reconciler::{
    ApplicationError, ApplicationOutcome, EnrollmentReconciler, ReconcileError, ReconcileFailure,
    ReconcileMode, ReconcileSummary,
};
pub use repository::{
    ApplicationQuery, CourseQuery, EnrollmentQuery, EnrollmentStore, RepositoryError,
};
pub use router::{enrollment_router, ReconcileRequest};
pub use store::{EnrollmentDocuments, InMemoryEnrollmentStore, JsonDocumentStore, StoreError};

use tracing::{error, info, warn};

use super::domain::{Application, Course, Enrollment};
use super::reconciler::{ReconcileFailure, ReconcileMode, ReconcileSummary};

/// Progress notifications emitted while a reconciliation pass runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    Started {
        approved: usize,
        mode: ReconcileMode,
    },
    CourseResolved {
        application: Application,
        course: Course,
    },
    CourseNotFound {
        application: Application,
    },
    AlreadyEnrolled {
        application: Application,
        course: Course,
    },
    Planned {
        application: Application,
        course: Course,
    },
    Created {
        enrollment: Enrollment,
    },
    Failed {
        failure: ReconcileFailure,
    },
    Finished {
        summary: ReconcileSummary,
    },
}

/// Side-effect hook so callers decide how progress is reported.
pub trait ReconcileObserver: Send + Sync {
    fn observe(&self, event: &ReconcileEvent);
}

/// Narrates each event as a human-readable tracing line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn observe(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::Started { approved, mode } => {
                info!(approved, ?mode, "found approved applications to reconcile");
            }
            ReconcileEvent::CourseResolved {
                application,
                course,
            } => {
                info!(
                    application_id = %application.id.0,
                    user_id = %application.user_id.0,
                    course_id = %course.id.0,
                    "matched course '{}'",
                    course.name
                );
            }
            ReconcileEvent::CourseNotFound { application } => {
                warn!(
                    application_id = %application.id.0,
                    user_id = %application.user_id.0,
                    "no active course named '{}', skipping",
                    application.course_selection
                );
            }
            ReconcileEvent::AlreadyEnrolled {
                application,
                course,
            } => {
                info!(
                    application_id = %application.id.0,
                    user_id = %application.user_id.0,
                    course_id = %course.id.0,
                    "enrollment already migrated, skipping"
                );
            }
            ReconcileEvent::Planned {
                application,
                course,
            } => {
                info!(
                    application_id = %application.id.0,
                    user_id = %application.user_id.0,
                    course_id = %course.id.0,
                    "dry run: would create enrollment"
                );
            }
            ReconcileEvent::Created { enrollment } => {
                info!(
                    enrollment_id = %enrollment.id.0,
                    application_id = %enrollment.application_id.0,
                    user_id = %enrollment.user_id.0,
                    course_id = %enrollment.course_id.0,
                    "created enrollment"
                );
            }
            ReconcileEvent::Failed { failure } => {
                error!(
                    application_id = %failure.application_id.0,
                    user_id = %failure.user_id.0,
                    "error processing application: {}",
                    failure.message
                );
            }
            ReconcileEvent::Finished { summary } => {
                info!(
                    created = summary.created,
                    already_existed = summary.already_existed,
                    course_not_found = summary.course_not_found,
                    planned = summary.planned,
                    failed = summary.failed,
                    "reconciliation complete: {} enrollment(s) created",
                    summary.created
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ReconcileObserver for SilentObserver {
    fn observe(&self, _event: &ReconcileEvent) {}
}

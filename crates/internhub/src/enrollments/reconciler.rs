use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, Enrollment, NewEnrollment, UserId};
use super::observer::{ReconcileEvent, ReconcileObserver};
use super::repository::{
    ApplicationQuery, CourseQuery, EnrollmentQuery, EnrollmentStore, RepositoryError,
};

/// Whether a pass writes enrollments or only reports what it would write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    #[default]
    Apply,
    DryRun,
}

/// Result of processing a single approved application.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationOutcome {
    Created(Enrollment),
    Planned,
    AlreadyEnrolled,
    CourseNotFound,
}

/// Application that could not be reconciled, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileFailure {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub message: String,
}

/// Tally of a reconciliation pass. This is the authoritative result for callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub already_existed: usize,
    pub course_not_found: usize,
    pub planned: usize,
    pub failed: usize,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileSummary {
    pub fn processed(&self) -> usize {
        self.created + self.already_existed + self.course_not_found + self.planned + self.failed
    }

    fn record(&mut self, outcome: &ApplicationOutcome) {
        match outcome {
            ApplicationOutcome::Created(_) => self.created += 1,
            ApplicationOutcome::Planned => self.planned += 1,
            ApplicationOutcome::AlreadyEnrolled => self.already_existed += 1,
            ApplicationOutcome::CourseNotFound => self.course_not_found += 1,
        }
    }

    fn record_failure(&mut self, failure: ReconcileFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }
}

/// Failure confined to one application; never aborts the pass.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("missing approval and creation timestamps")]
    MissingTimestamps,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Failure that stops the pass before any application is processed.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("unable to load approved applications: {0}")]
    ApplicationsUnavailable(#[source] RepositoryError),
}

/// Back-fills enrollments from approved applications.
pub struct EnrollmentReconciler<S, O> {
    store: Arc<S>,
    observer: Arc<O>,
    mode: ReconcileMode,
}

impl<S, O> EnrollmentReconciler<S, O>
where
    S: EnrollmentStore + 'static,
    O: ReconcileObserver + 'static,
{
    pub fn new(store: Arc<S>, observer: Arc<O>) -> Self {
        Self::with_mode(store, observer, ReconcileMode::Apply)
    }

    pub fn with_mode(store: Arc<S>, observer: Arc<O>, mode: ReconcileMode) -> Self {
        Self {
            store,
            observer,
            mode,
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Run one pass over every approved application.
    ///
    /// Applications are handled one at a time so the existence check and the insert for a
    /// given user and course never interleave with another write from this pass.
    pub fn run(&self) -> Result<ReconcileSummary, ReconcileError> {
        let applications = self
            .store
            .find_applications(&ApplicationQuery::approved())
            .map_err(ReconcileError::ApplicationsUnavailable)?;

        self.observer.observe(&ReconcileEvent::Started {
            approved: applications.len(),
            mode: self.mode,
        });

        let mut summary = ReconcileSummary::default();
        let mut planned = HashSet::new();
        for application in &applications {
            match self.reconcile_with(application, &mut planned) {
                Ok(outcome) => summary.record(&outcome),
                Err(err) => {
                    let failure = ReconcileFailure {
                        application_id: application.id.clone(),
                        user_id: application.user_id.clone(),
                        message: err.to_string(),
                    };
                    self.observer.observe(&ReconcileEvent::Failed {
                        failure: failure.clone(),
                    });
                    summary.record_failure(failure);
                }
            }
        }

        self.observer.observe(&ReconcileEvent::Finished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Ensure a single approved application has its enrollment.
    pub fn reconcile_application(
        &self,
        application: &Application,
    ) -> Result<ApplicationOutcome, ApplicationError> {
        self.reconcile_with(application, &mut HashSet::new())
    }

    /// `planned` holds the keys a dry run has already promised during this pass, so a
    /// repeated (user, course) pair reports the same outcome an apply pass would.
    fn reconcile_with(
        &self,
        application: &Application,
        planned: &mut HashSet<EnrollmentQuery>,
    ) -> Result<ApplicationOutcome, ApplicationError> {
        let course = match self
            .store
            .find_course(&CourseQuery::active(application.course_selection.as_str()))?
        {
            Some(course) => course,
            None => {
                self.observer.observe(&ReconcileEvent::CourseNotFound {
                    application: application.clone(),
                });
                return Ok(ApplicationOutcome::CourseNotFound);
            }
        };

        self.observer.observe(&ReconcileEvent::CourseResolved {
            application: application.clone(),
            course: course.clone(),
        });

        let key = EnrollmentQuery {
            user_id: application.user_id.clone(),
            course_id: course.id.clone(),
        };
        if planned.contains(&key) || self.store.find_enrollment(&key)?.is_some() {
            self.observer.observe(&ReconcileEvent::AlreadyEnrolled {
                application: application.clone(),
                course,
            });
            return Ok(ApplicationOutcome::AlreadyEnrolled);
        }

        let anchor = application
            .enrollment_anchor()
            .ok_or(ApplicationError::MissingTimestamps)?;

        if self.mode == ReconcileMode::DryRun {
            planned.insert(key);
            self.observer.observe(&ReconcileEvent::Planned {
                application: application.clone(),
                course,
            });
            return Ok(ApplicationOutcome::Planned);
        }

        let draft = NewEnrollment::from_application(application, &course, anchor);
        match self.store.create_enrollment(draft) {
            Ok(enrollment) => {
                self.observer.observe(&ReconcileEvent::Created {
                    enrollment: enrollment.clone(),
                });
                Ok(ApplicationOutcome::Created(enrollment))
            }
            // Lost a race with another writer; the unique key already holds the record.
            Err(RepositoryError::Conflict) => {
                self.observer.observe(&ReconcileEvent::AlreadyEnrolled {
                    application: application.clone(),
                    course,
                });
                Ok(ApplicationOutcome::AlreadyEnrolled)
            }
            Err(other) => Err(other.into()),
        }
    }
}

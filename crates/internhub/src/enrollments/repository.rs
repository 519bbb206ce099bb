use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationStatus, Course, CourseId, CourseStatus, Enrollment, NewEnrollment,
    UserId,
};

/// Filter for the application collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationQuery {
    pub status: ApplicationStatus,
}

impl ApplicationQuery {
    pub fn approved() -> Self {
        Self {
            status: ApplicationStatus::Approved,
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        application.status == self.status
    }
}

/// Exact-name lookup for a course offering in a given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseQuery {
    pub name: String,
    pub status: CourseStatus,
}

impl CourseQuery {
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CourseStatus::Active,
        }
    }

    pub fn matches(&self, course: &Course) -> bool {
        course.status == self.status && course.name == self.name
    }
}

/// Unique key of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentQuery {
    pub user_id: UserId,
    pub course_id: CourseId,
}

impl EnrollmentQuery {
    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        enrollment.user_id == self.user_id && enrollment.course_id == self.course_id
    }
}

impl From<&NewEnrollment> for EnrollmentQuery {
    fn from(value: &NewEnrollment) -> Self {
        Self {
            user_id: value.user_id.clone(),
            course_id: value.course_id.clone(),
        }
    }
}

/// Storage abstraction over the application, course, and enrollment collections.
///
/// Implementations must reject a second enrollment for the same user and course with
/// [`RepositoryError::Conflict`].
pub trait EnrollmentStore: Send + Sync {
    fn find_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn find_course(&self, query: &CourseQuery) -> Result<Option<Course>, RepositoryError>;
    fn find_enrollment(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError>;
    fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("enrollment already exists for this user and course")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored documents are corrupt: {0}")]
    Corrupt(String),
}

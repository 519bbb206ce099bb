use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timezone stamped on every back-filled enrollment.
pub const DEFAULT_ENROLLMENT_TIMEZONE: &str = "Asia/Kolkata";

/// Identifier wrapper for submitted internship applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for platform users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier wrapper for internship course offerings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub String);

/// Identifier wrapper for persisted enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub String);

/// Review state of an application. Only `Approved` applications are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    /// Any workflow state this tool does not act on, e.g. `Shortlisted`.
    #[serde(other)]
    Other,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Other => "Other",
        }
    }
}

/// Whether a course offering currently accepts enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseStatus {
    Active,
    Inactive,
    #[serde(other)]
    Other,
}

impl CourseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Dropped,
}

/// A user's request to join a course offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    /// Free-text course name chosen on the application form.
    pub course_selection: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Application {
    /// Date the resulting enrollment starts from: approval time, falling back to submission time.
    pub fn enrollment_anchor(&self) -> Option<DateTime<Utc>> {
        self.approved_at.or(self.created_at)
    }
}

/// An internship offering users can be enrolled into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub status: CourseStatus,
}

/// Durable link between a user and a course they were confirmed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub application_id: ApplicationId,
    pub registered_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    pub timezone: String,
}

/// Enrollment payload prior to the store assigning an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub application_id: ApplicationId,
    pub registered_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub timezone: String,
}

impl NewEnrollment {
    pub fn from_application(
        application: &Application,
        course: &Course,
        anchor: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: application.user_id.clone(),
            course_id: course.id.clone(),
            application_id: application.id.clone(),
            registered_at: anchor,
            start_date: anchor,
            status: EnrollmentStatus::Active,
            timezone: DEFAULT_ENROLLMENT_TIMEZONE.to_string(),
        }
    }

    pub fn into_enrollment(self, id: EnrollmentId) -> Enrollment {
        Enrollment {
            id,
            user_id: self.user_id,
            course_id: self.course_id,
            application_id: self.application_id,
            registered_at: self.registered_at,
            start_date: self.start_date,
            status: self.status,
            timezone: self.timezone,
        }
    }
}

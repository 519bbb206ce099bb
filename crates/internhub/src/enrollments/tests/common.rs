use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::enrollments::domain::{
    Application, ApplicationId, ApplicationStatus, Course, CourseId, CourseStatus, Enrollment,
    EnrollmentId, EnrollmentStatus, NewEnrollment, UserId, DEFAULT_ENROLLMENT_TIMEZONE,
};
use crate::enrollments::observer::{ReconcileEvent, ReconcileObserver};
use crate::enrollments::repository::{
    ApplicationQuery, CourseQuery, EnrollmentQuery, EnrollmentStore, RepositoryError,
};
use crate::enrollments::store::{EnrollmentDocuments, InMemoryEnrollmentStore};

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn course(id: &str, name: &str, status: CourseStatus) -> Course {
    Course {
        id: CourseId(id.to_string()),
        name: name.to_string(),
        status,
    }
}

pub(super) fn approved(id: &str, user: &str, selection: &str) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        user_id: UserId(user.to_string()),
        course_selection: selection.to_string(),
        status: ApplicationStatus::Approved,
        approved_at: Some(at(2024, 6, 3)),
        created_at: Some(at(2024, 5, 20)),
    }
}

pub(super) fn existing_enrollment(id: &str, user: &str, course_id: &str) -> Enrollment {
    Enrollment {
        id: EnrollmentId(id.to_string()),
        user_id: UserId(user.to_string()),
        course_id: CourseId(course_id.to_string()),
        application_id: ApplicationId(format!("legacy-{user}")),
        registered_at: at(2024, 1, 15),
        start_date: at(2024, 1, 15),
        status: EnrollmentStatus::Active,
        timezone: DEFAULT_ENROLLMENT_TIMEZONE.to_string(),
    }
}

pub(super) fn catalog() -> Vec<Course> {
    vec![
        course("course-web", "Full Stack Web Development", CourseStatus::Active),
        course("course-ml", "Machine Learning", CourseStatus::Active),
        course("course-iot", "IoT Fundamentals", CourseStatus::Inactive),
    ]
}

/// One application per outcome: creatable, unknown course, already enrolled.
pub(super) fn mixed_documents() -> EnrollmentDocuments {
    EnrollmentDocuments {
        applications: vec![
            approved("app-1", "user-asha", "Full Stack Web Development"),
            approved("app-2", "user-ravi", "Blockchain Basics"),
            approved("app-3", "user-meera", "Machine Learning"),
        ],
        courses: catalog(),
        enrollments: vec![existing_enrollment("enr-legacy", "user-meera", "course-ml")],
    }
}

pub(super) fn store_with(documents: EnrollmentDocuments) -> Arc<InMemoryEnrollmentStore> {
    Arc::new(InMemoryEnrollmentStore::with_documents(documents))
}

pub(super) fn assert_unique_pairs(enrollments: &[Enrollment]) {
    let mut seen = HashSet::new();
    for enrollment in enrollments {
        assert!(
            seen.insert((enrollment.user_id.clone(), enrollment.course_id.clone())),
            "duplicate enrollment for {:?} in {:?}",
            enrollment.user_id,
            enrollment.course_id
        );
    }
}

#[derive(Default)]
pub(super) struct RecordingObserver {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingObserver {
    pub(super) fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().expect("observer mutex poisoned").clone()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn observe(&self, event: &ReconcileEvent) {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .push(event.clone());
    }
}

/// Delegates to an in-memory store but refuses to write enrollments for one user.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryEnrollmentStore,
    pub(super) failing_user: UserId,
}

impl EnrollmentStore for FlakyStore {
    fn find_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.find_applications(query)
    }

    fn find_course(&self, query: &CourseQuery) -> Result<Option<Course>, RepositoryError> {
        self.inner.find_course(query)
    }

    fn find_enrollment(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        self.inner.find_enrollment(query)
    }

    fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        if enrollment.user_id == self.failing_user {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.inner.create_enrollment(enrollment)
    }
}

/// Store whose existence check never sees prior writes, as if another worker raced it.
pub(super) struct BlindReadStore {
    pub(super) inner: InMemoryEnrollmentStore,
}

impl EnrollmentStore for BlindReadStore {
    fn find_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.find_applications(query)
    }

    fn find_course(&self, query: &CourseQuery) -> Result<Option<Course>, RepositoryError> {
        self.inner.find_course(query)
    }

    fn find_enrollment(
        &self,
        _query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(None)
    }

    fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        self.inner.create_enrollment(enrollment)
    }
}

pub(super) struct OfflineStore;

impl EnrollmentStore for OfflineStore {
    fn find_applications(
        &self,
        _query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn find_course(&self, _query: &CourseQuery) -> Result<Option<Course>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn find_enrollment(
        &self,
        _query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn create_enrollment(&self, _enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::domain::{Application, Course, Enrollment, EnrollmentId, NewEnrollment};
use super::repository::{
    ApplicationQuery, CourseQuery, EnrollmentQuery, EnrollmentStore, RepositoryError,
};

/// The three collections the reconciler reads and writes, as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentDocuments {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

impl EnrollmentDocuments {
    fn find_applications(&self, query: &ApplicationQuery) -> Vec<Application> {
        self.applications
            .iter()
            .filter(|application| query.matches(application))
            .cloned()
            .collect()
    }

    fn find_course(&self, query: &CourseQuery) -> Option<Course> {
        self.courses
            .iter()
            .find(|course| query.matches(course))
            .cloned()
    }

    fn find_enrollment(&self, query: &EnrollmentQuery) -> Option<Enrollment> {
        self.enrollments
            .iter()
            .find(|enrollment| query.matches(enrollment))
            .cloned()
    }

    /// Append an enrollment, enforcing the unique (user, course) key.
    fn insert_enrollment(&mut self, draft: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        if self.find_enrollment(&EnrollmentQuery::from(&draft)).is_some() {
            return Err(RepositoryError::Conflict);
        }
        let enrollment = draft.into_enrollment(self.next_enrollment_id());
        self.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    fn next_enrollment_id(&self) -> EnrollmentId {
        let mut sequence = self.enrollments.len() + 1;
        loop {
            let candidate = EnrollmentId(format!("enr-{sequence:06}"));
            if !self.enrollments.iter().any(|existing| existing.id == candidate) {
                return candidate;
            }
            sequence += 1;
        }
    }
}

/// Failure opening or persisting a document snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to read store at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("unable to write store at {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("store at {} is not a valid document snapshot: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to encode store snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

fn lock(
    documents: &Mutex<EnrollmentDocuments>,
) -> Result<MutexGuard<'_, EnrollmentDocuments>, RepositoryError> {
    documents
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

/// Process-local store used by the HTTP demo and tests.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentStore {
    documents: Mutex<EnrollmentDocuments>,
}

impl InMemoryEnrollmentStore {
    pub fn with_documents(documents: EnrollmentDocuments) -> Self {
        Self {
            documents: Mutex::new(documents),
        }
    }

    pub fn snapshot(&self) -> Result<EnrollmentDocuments, RepositoryError> {
        Ok(lock(&self.documents)?.clone())
    }

    pub fn enrollments(&self) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.documents)?.enrollments.clone())
    }
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn find_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(lock(&self.documents)?.find_applications(query))
    }

    fn find_course(&self, query: &CourseQuery) -> Result<Option<Course>, RepositoryError> {
        Ok(lock(&self.documents)?.find_course(query))
    }

    fn find_enrollment(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(lock(&self.documents)?.find_enrollment(query))
    }

    fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        lock(&self.documents)?.insert_enrollment(enrollment)
    }
}

/// File-backed snapshot of the application, course, and enrollment collections.
///
/// The file is re-read at the start of every pass (`find_applications`) and before every
/// write, so edits and enrollments made by other processes are picked up. Every created
/// enrollment is flushed to disk before `create_enrollment` returns, so an interrupted
/// pass leaves a consistent file that can simply be reconciled again. Writers in separate
/// processes are not locked against each other: two writes landing between one's re-read
/// and the other's rename keep only the later file until the next pass re-creates the lost
/// enrollment.
#[derive(Debug)]
pub struct JsonDocumentStore {
    path: PathBuf,
    documents: Mutex<EnrollmentDocuments>,
}

impl JsonDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let documents = load(&path)?;

        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }

    /// Write `documents` to `path`, replacing any existing snapshot.
    pub fn create(
        path: impl AsRef<Path>,
        documents: EnrollmentDocuments,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        persist(&path, &documents)?;
        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Result<EnrollmentDocuments, RepositoryError> {
        Ok(lock(&self.documents)?.clone())
    }

    /// Replace the cached collections with the file's current contents, keeping the lock.
    fn refresh(&self) -> Result<MutexGuard<'_, EnrollmentDocuments>, RepositoryError> {
        let mut documents = lock(&self.documents)?;
        *documents = load(&self.path).map_err(|err| match err {
            decode @ StoreError::Decode { .. } => RepositoryError::Corrupt(decode.to_string()),
            other => RepositoryError::Unavailable(other.to_string()),
        })?;
        Ok(documents)
    }
}

fn load(path: &Path) -> Result<EnrollmentDocuments, StoreError> {
    let raw = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn persist(path: &Path, documents: &EnrollmentDocuments) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec_pretty(documents)?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, encoded).map_err(|source| StoreError::Write {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl EnrollmentStore for JsonDocumentStore {
    fn find_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.refresh()?.find_applications(query))
    }

    fn find_course(&self, query: &CourseQuery) -> Result<Option<Course>, RepositoryError> {
        Ok(lock(&self.documents)?.find_course(query))
    }

    fn find_enrollment(
        &self,
        query: &EnrollmentQuery,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(lock(&self.documents)?.find_enrollment(query))
    }

    fn create_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        let mut documents = self.refresh()?;
        let mut staged = documents.clone();
        let created = staged.insert_enrollment(enrollment)?;

        persist(&self.path, &staged).map_err(|err| match err {
            StoreError::Encode(source) => RepositoryError::Corrupt(source.to_string()),
            other => RepositoryError::Unavailable(other.to_string()),
        })?;

        *documents = staged;
        Ok(created)
    }
}

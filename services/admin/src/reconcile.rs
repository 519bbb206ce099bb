use clap::Args;
use internhub::config::AppConfig;
use internhub::enrollments::{
    EnrollmentReconciler, JsonDocumentStore, ReconcileMode, ReconcileSummary, TracingObserver,
};
use internhub::error::AppError;
use internhub::telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ReconcileArgs {
    /// Document snapshot to reconcile (defaults to INTERNHUB_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Report the enrollments that would be created without writing them
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Also print the summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let ReconcileArgs {
        store,
        dry_run,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let path = store.unwrap_or(config.store.path);
    let mode = if dry_run {
        ReconcileMode::DryRun
    } else {
        ReconcileMode::Apply
    };

    let summary = reconcile_snapshot(&path, mode)?;
    for line in summary_lines(&path, mode, &summary) {
        println!("{line}");
    }

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Summary payload unavailable: {err}"),
        }
    }

    Ok(())
}

/// Open the snapshot and run one pass. Only store and bulk-read failures are errors.
pub(crate) fn reconcile_snapshot(
    path: &Path,
    mode: ReconcileMode,
) -> Result<ReconcileSummary, AppError> {
    let store = Arc::new(JsonDocumentStore::open(path)?);
    let reconciler = EnrollmentReconciler::with_mode(store, Arc::new(TracingObserver), mode);
    Ok(reconciler.run()?)
}

pub(crate) fn summary_lines(
    path: &Path,
    mode: ReconcileMode,
    summary: &ReconcileSummary,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Enrollment reconciliation ({}) against {}",
        match mode {
            ReconcileMode::Apply => "apply",
            ReconcileMode::DryRun => "dry run",
        },
        path.display()
    )];
    lines.push(format!(
        "- {} approved application(s) processed",
        summary.processed()
    ));
    lines.push(format!("- {} enrollment(s) created", summary.created));
    if mode == ReconcileMode::DryRun {
        lines.push(format!("- {} enrollment(s) would be created", summary.planned));
    }
    lines.push(format!("- {} already migrated", summary.already_existed));
    lines.push(format!(
        "- {} skipped (no active course)",
        summary.course_not_found
    ));
    lines.push(format!("- {} failed", summary.failed));
    for failure in &summary.failures {
        lines.push(format!(
            "  - {} (user {}): {}",
            failure.application_id.0, failure.user_id.0, failure.message
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use internhub::enrollments::{
        Application, ApplicationId, ApplicationStatus, Course, CourseId, CourseStatus,
        EnrollmentDocuments, ReconcileFailure, UserId,
    };

    fn snapshot() -> EnrollmentDocuments {
        let approved_at = Utc
            .with_ymd_and_hms(2024, 6, 3, 10, 0, 0)
            .single()
            .expect("valid timestamp");
        EnrollmentDocuments {
            applications: vec![Application {
                id: ApplicationId("app-1".to_string()),
                user_id: UserId("user-1".to_string()),
                course_selection: "Cyber Security".to_string(),
                status: ApplicationStatus::Approved,
                approved_at: Some(approved_at),
                created_at: None,
            }],
            courses: vec![Course {
                id: CourseId("course-sec".to_string()),
                name: "Cyber Security".to_string(),
                status: CourseStatus::Active,
            }],
            enrollments: Vec::new(),
        }
    }

    #[test]
    fn reconcile_snapshot_applies_and_is_repeatable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        JsonDocumentStore::create(&path, snapshot()).expect("snapshot written");

        let first = reconcile_snapshot(&path, ReconcileMode::Apply).expect("first pass");
        let second = reconcile_snapshot(&path, ReconcileMode::Apply).expect("second pass");

        assert_eq!(first.created, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.already_existed, 1);
    }

    #[test]
    fn reconcile_snapshot_dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        JsonDocumentStore::create(&path, snapshot()).expect("snapshot written");
        let before = std::fs::read(&path).expect("read snapshot");

        let summary = reconcile_snapshot(&path, ReconcileMode::DryRun).expect("dry run");

        assert_eq!(summary.planned, 1);
        assert_eq!(std::fs::read(&path).expect("read snapshot"), before);
    }

    #[test]
    fn missing_snapshot_is_a_store_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        match reconcile_snapshot(&dir.path().join("missing.json"), ReconcileMode::Apply) {
            Err(AppError::Store(_)) => {}
            other => panic!("expected store error, got {other:?}"),
        }
    }

    #[test]
    fn summary_lines_list_failures() {
        let summary = ReconcileSummary {
            created: 2,
            already_existed: 1,
            course_not_found: 0,
            planned: 0,
            failed: 1,
            failures: vec![ReconcileFailure {
                application_id: ApplicationId("app-7".to_string()),
                user_id: UserId("user-7".to_string()),
                message: "store unavailable: write timed out".to_string(),
            }],
        };

        let lines = summary_lines(Path::new("store.json"), ReconcileMode::Apply, &summary);

        assert_eq!(lines[0], "Enrollment reconciliation (apply) against store.json");
        assert!(lines.contains(&"- 2 enrollment(s) created".to_string()));
        assert!(lines
            .last()
            .expect("failure line")
            .contains("app-7 (user user-7): store unavailable"));
    }
}

pub mod config;
pub mod enrollments;
pub mod error;
pub mod telemetry;

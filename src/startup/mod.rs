//! Startup self-checks
//!
//! Run before the server starts accepting requests:
//! - Database connectivity
//! - Required tables present
//! - Upload directory writable
//!
//! The same checks back the `/health` endpoint.

use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::REQUIRED_TABLES;
use crate::DbPool;

/// Result of a single startup check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Whether this check is critical (failure should abort startup)
    pub critical: bool,
    /// Human-readable message describing the result
    pub message: String,
    /// Additional details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Aggregated startup check results
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckReport {
    pub checks: Vec<CheckResult>,
    /// Whether all critical checks passed
    pub all_critical_passed: bool,
    pub all_passed: bool,
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks.iter().filter(|c| c.critical && !c.passed).count();
        let failed_non_critical = checks.iter().filter(|c| !c.critical && !c.passed).count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }
}

/// Run all startup self-checks
pub async fn run_startup_checks(config: &Config, db: &DbPool) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let checks = vec![
        check_database_connectivity(db).await,
        check_database_schema(db).await,
        check_upload_directory(&config.server.upload_dir),
    ];

    let report = StartupCheckReport::new(checks);

    for check in &report.checks {
        if check.passed {
            info!(check = %check.name, message = %check.message, "Startup check PASSED");
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );

    report
}

async fn check_database_connectivity(db: &DbPool) -> CheckResult {
    match sqlx::query("SELECT 1").fetch_one(db).await {
        Ok(_) => CheckResult::pass("database_connectivity", "Database connection successful"),
        Err(e) => CheckResult::fail("database_connectivity", "Failed to connect to database", true)
            .with_details(e.to_string()),
    }
}

/// Every collection the handlers touch must exist
async fn check_database_schema(db: &DbPool) -> CheckResult {
    let result: Result<Vec<(String,)>, _> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(db)
    .await;

    match result {
        Ok(tables) => {
            let table_names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
            let missing: Vec<&str> = REQUIRED_TABLES
                .iter()
                .filter(|t| !table_names.contains(*t))
                .copied()
                .collect();

            if missing.is_empty() {
                CheckResult::pass(
                    "database_schema",
                    format!("Database schema valid ({} tables)", tables.len()),
                )
                .with_details(format!("Tables: {}", table_names.join(", ")))
            } else {
                CheckResult::fail("database_schema", "Missing required database tables", true)
                    .with_details(format!("Missing: {}", missing.join(", ")))
            }
        }
        Err(e) => CheckResult::fail("database_schema", "Failed to query database schema", true)
            .with_details(e.to_string()),
    }
}

/// Only profile photo uploads depend on this, so a failure is a warning
fn check_upload_directory(upload_dir: &Path) -> CheckResult {
    if !upload_dir.is_dir() {
        return CheckResult::fail("upload_directory", "Upload directory does not exist", false)
            .with_details(format!("Path: {}", upload_dir.display()));
    }

    let test_file = upload_dir.join(".fotografi_write_test");

    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_file);
            CheckResult::pass("upload_directory", "Upload directory is writable")
                .with_details(format!("Path: {}", upload_dir.display()))
        }
        Err(e) => CheckResult::fail("upload_directory", "Upload directory is not writable", false)
            .with_details(format!("{}: {}", upload_dir.display(), e)),
    }
}

/// Health report served at `/health`
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthStatus {
    /// Overall health; only the database decides it
    pub healthy: bool,
    pub database_healthy: bool,
    pub uploads_writable: bool,
    pub checks: Vec<CheckResult>,
    pub version: String,
}

pub async fn get_system_health(config: &Config, db: &DbPool) -> SystemHealthStatus {
    let db_check = check_database_connectivity(db).await;
    let upload_check = check_upload_directory(&config.server.upload_dir);

    let database_healthy = db_check.passed;
    let uploads_writable = upload_check.passed;

    SystemHealthStatus {
        healthy: database_healthy,
        database_healthy,
        uploads_writable,
        checks: vec![db_check, upload_check],
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

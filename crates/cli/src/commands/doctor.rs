use serde::Serialize;

use cotiza_core::config::{AppConfig, LoadOptions};
use cotiza_db::{connect_with_settings, migrations, SqlQuestionRepository};

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    passed: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: String,
    checks: Vec<DoctorCheck>,
}

/// Runs readiness checks: configuration, database connectivity, applied
/// migrations, and questionnaire presence.
pub fn run(json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                passed: true,
                detail: format!("database url `{}`", config.database.url),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck { name: "config", passed: false, detail: error.to_string() });
            None
        }
    };

    if let Some(config) = config {
        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime.block_on(async {
                match connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                {
                    Ok(pool) => {
                        checks.push(DoctorCheck {
                            name: "database",
                            passed: true,
                            detail: "connection established".to_string(),
                        });

                        match migrations::run_pending(&pool).await {
                            Ok(()) => checks.push(DoctorCheck {
                                name: "migrations",
                                passed: true,
                                detail: "schema is up to date".to_string(),
                            }),
                            Err(error) => checks.push(DoctorCheck {
                                name: "migrations",
                                passed: false,
                                detail: error.to_string(),
                            }),
                        }

                        let repo = SqlQuestionRepository::new(pool.clone());
                        match repo.count_all().await {
                            Ok(count) => checks.push(DoctorCheck {
                                name: "questionnaire",
                                passed: count > 0,
                                detail: format!("{count} question(s) defined"),
                            }),
                            Err(error) => checks.push(DoctorCheck {
                                name: "questionnaire",
                                passed: false,
                                detail: error.to_string(),
                            }),
                        }

                        pool.close().await;
                    }
                    Err(error) => checks.push(DoctorCheck {
                        name: "database",
                        passed: false,
                        detail: error.to_string(),
                    }),
                }
            }),
            Err(error) => checks.push(DoctorCheck {
                name: "runtime",
                passed: false,
                detail: error.to_string(),
            }),
        }
    }

    let all_passed = checks.iter().all(|check| check.passed);
    let report = DoctorReport {
        status: if all_passed { "ok".to_string() } else { "degraded".to_string() },
        checks,
    };

    if json {
        serde_json::to_string(&report).unwrap_or_else(|error| {
            format!("{{\"status\":\"error\",\"message\":\"{error}\"}}")
        })
    } else {
        let mut lines = vec![format!("doctor: {}", report.status)];
        for check in &report.checks {
            let mark = if check.passed { "ok" } else { "FAIL" };
            lines.push(format!("  [{mark}] {}: {}", check.name, check.detail));
        }
        lines.join("\n")
    }
}

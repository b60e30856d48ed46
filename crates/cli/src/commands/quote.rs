use std::fs;
use std::path::Path;

use cotiza_core::config::{AppConfig, LoadOptions};
use cotiza_core::{aggregate, AnswerSet, ServiceId};
use cotiza_db::{connect_with_settings, SqlQuestionRepository};

use crate::commands::CommandResult;

/// Prices an answers file against a stored questionnaire without
/// persisting anything. The offline smoke of the full pricing path:
/// definition load, wire decode, evaluation, aggregation.
pub fn run(service: &str, answers_path: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let raw_answers = match fs::read_to_string(answers_path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "answers_io",
                format!("could not read `{}`: {error}", answers_path.display()),
                6,
            );
        }
    };
    let wire: serde_json::Value = match serde_json::from_str(&raw_answers) {
        Ok(wire) => wire,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "answers_parse",
                format!("invalid answers JSON: {error}"),
                6,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let repo = SqlQuestionRepository::new(pool.clone());
        let questionnaire = repo
            .list_for_service(&ServiceId(service.to_string()))
            .await
            .map_err(|error| ("questionnaire_load", error.to_string(), 4u8))?;
        pool.close().await;

        if questionnaire.is_empty() {
            return Err((
                "questionnaire_load",
                format!("no questions defined for service `{service}`"),
                6u8,
            ));
        }

        let answers = AnswerSet::from_wire(&questionnaire, &wire)
            .map_err(|error| ("answer_validation", error.to_string(), 6u8))?;
        let totals = aggregate(&questionnaire, &answers)
            .map_err(|error| ("pricing", error.to_string(), 6u8))?;

        Ok::<_, (&'static str, String, u8)>(totals)
    });

    match result {
        Ok(totals) => CommandResult::success(
            "quote",
            format!(
                "subtotal={} iva={} total={}",
                totals.subtotal, totals.iva, totals.total
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("quote", error_class, message, exit_code)
        }
    }
}

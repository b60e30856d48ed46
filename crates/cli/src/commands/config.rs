use serde_json::json;

use cotiza_core::config::{AppConfig, LoadOptions, LogFormat};

/// Prints the effective configuration as JSON with secrets redacted.
pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let format = match config.logging.format {
                LogFormat::Compact => "compact",
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            };
            let payload = json!({
                "database": {
                    "url": config.database.url,
                    "max_connections": config.database.max_connections,
                    "timeout_secs": config.database.timeout_secs,
                },
                "advisory": {
                    "enabled": config.advisory.enabled,
                    "api_key": config.advisory.api_key.as_ref().map(|_| "<redacted>"),
                    "base_url": config.advisory.base_url,
                    "model": config.advisory.model,
                    "timeout_secs": config.advisory.timeout_secs,
                },
                "logging": {
                    "level": config.logging.level,
                    "format": format,
                },
            });
            serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
        }
        Err(error) => {
            json!({ "error": error.to_string() }).to_string()
        }
    }
}

use serde::Serialize;

use wapprove_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    database: DatabaseView,
    whatsapp: WhatsAppView,
    server: ServerView,
    logging: LoggingView,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct WhatsAppView {
    configured: bool,
    account_sid: String,
    auth_token: &'static str,
    from_number: String,
    webhook_secret: &'static str,
}

#[derive(Debug, Serialize)]
struct ServerView {
    bind_address: String,
    port: u16,
    graceful_shutdown_secs: u64,
}

#[derive(Debug, Serialize)]
struct LoggingView {
    level: String,
    format: LogFormat,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("configuration issue: {error}"),
    };

    let view = EffectiveConfig {
        database: DatabaseView {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            timeout_secs: config.database.timeout_secs,
        },
        whatsapp: WhatsAppView {
            configured: config.whatsapp.is_configured(),
            account_sid: redact_sid(&config.whatsapp.account_sid),
            auth_token: "<redacted>",
            from_number: config.whatsapp.from_number.clone(),
            webhook_secret: if config.whatsapp.webhook_secret.is_some() {
                "<redacted>"
            } else {
                "<not set>"
            },
        },
        server: ServerView {
            bind_address: config.server.bind_address.clone(),
            port: config.server.port,
            graceful_shutdown_secs: config.server.graceful_shutdown_secs,
        },
        logging: LoggingView {
            level: config.logging.level.clone(),
            format: config.logging.format,
        },
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("config serialization failed: {error}"))
}

/// Keeps the SID recognizable without exposing it fully.
fn redact_sid(account_sid: &str) -> String {
    if account_sid.len() <= 6 {
        return account_sid.to_string();
    }
    format!("{}…", &account_sid[..6])
}

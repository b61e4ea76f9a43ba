//! # Lead Relay Service
//!
//! Binary entry point for the lead relay HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the CRM webhook client
//! - Starts the HTTP server from lead-relay-api

use anyhow::Context;
use lead_relay_api::{start_server, LoggingConfig, ServiceConfig, ServiceError};
use lead_relay_core::CrmWebhookClient;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging settings live in the configuration, so load it first and
    // report any failure once the subscriber is up.
    let loaded = load_configuration();

    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting Lead Relay Service");

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    let forwarder = match CrmWebhookClient::new(service_config.crm.client_config()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to build CRM webhook client; aborting");
            std::process::exit(3);
        }
    };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        crm_host = %forwarder.endpoint_host(),
        lead_sources = service_config.lead_sources.table.len(),
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, forwarder).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}

// ============================================================================
// Private helpers
// ============================================================================

/// Load the service configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. /etc/lead-relay/service.yaml
///  2. ./config/service.yaml
///  3. the file named by `LEAD_RELAY_CONFIG_FILE`
///  4. variables prefixed `LEAD_RELAY__`, e.g. `LEAD_RELAY__CRM__UID`
///  5. `PORT`
///
/// Every field has a default, so an unconfigured environment yields a
/// working relay. A malformed file or an uncoercible variable is an error.
fn load_configuration() -> anyhow::Result<ServiceConfig> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/lead-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Ok(explicit_path) = std::env::var("LEAD_RELAY_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            builder = builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }
    }

    let mut service_config: ServiceConfig = builder
        .add_source(
            config::Environment::with_prefix("LEAD_RELAY")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins"),
        )
        .build()
        .context("failed to build configuration")?
        .try_deserialize()
        .context("could not deserialize service configuration")?;

    service_config
        .apply_port_override(std::env::var("PORT").ok().as_deref())
        .context("invalid PORT")?;

    Ok(service_config)
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lead_relay_service={level},lead_relay_api={level},lead_relay_core={level},tower_http=info",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Registers the compiled-in channel types, opens the configured storage
//! backend, wires the notification service and serves the gateway until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use courier_config::CourierConfig;
use courier_core::CourierError;
use courier_core::traits::ChannelType;
use courier_registry::ChannelTypeRegistry;
use courier_service::NotificationService;
use courier_storage::Repositories;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::shutdown;

/// Every channel type compiled into this binary.
fn builtin_channel_types() -> Vec<Arc<dyn ChannelType>> {
    #[allow(unused_mut)]
    let mut types: Vec<Arc<dyn ChannelType>> = Vec::new();
    #[cfg(feature = "email")]
    types.push(Arc::new(courier_email::EmailChannelType));
    #[cfg(feature = "sms")]
    types.push(Arc::new(courier_sms::SmsChannelType));
    #[cfg(feature = "slack")]
    types.push(Arc::new(courier_slack::SlackChannelType));
    types
}

/// Builds the registry from the compiled-in types the config leaves enabled.
pub fn build_registry(config: &CourierConfig) -> Result<ChannelTypeRegistry, CourierError> {
    let mut registry = ChannelTypeRegistry::new();
    for channel_type in builtin_channel_types() {
        if config.channel_type_enabled(channel_type.name()) {
            registry.register(channel_type)?;
        } else {
            info!(channel_type = channel_type.name(), "channel type disabled by config");
        }
    }
    info!(count = registry.len(), types = ?registry.names(), "channel type registry initialized");
    Ok(registry)
}

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting courier serve");

    let registry = Arc::new(build_registry(&config)?);
    let repos = Repositories::open(&config.storage).await?;
    let service = Arc::new(
        NotificationService::builder()
            .channels(Arc::clone(&repos.channels))
            .templates(Arc::clone(&repos.templates))
            .messages(Arc::clone(&repos.messages))
            .registry(registry)
            .dispatch_config(config.dispatch.clone())
            .build()?,
    );

    let cancel = shutdown::install_signal_handler();
    let served = serve_until_cancelled(&config, Arc::clone(&service), cancel.clone()).await;
    // A failed server still has to release senders and storage.
    cancel.cancel();

    let timeout = Duration::from_secs(config.dispatch.shutdown_timeout_secs);
    shutdown::drain("sender cleanup", timeout, service.shutdown()).await;
    if let Err(e) = repos.close().await {
        warn!(error = %e, "storage close failed");
    }

    info!("courier serve shutdown complete");
    served
}

#[cfg(feature = "gateway")]
async fn serve_until_cancelled(
    config: &CourierConfig,
    service: Arc<NotificationService>,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    use courier_gateway::{GatewayState, ServerConfig, start_server};

    if !config.gateway.enabled {
        info!("gateway disabled; waiting for shutdown signal");
        cancel.cancelled().await;
        return Ok(());
    }
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    start_server(&server_config, GatewayState::new(service, cancel)).await
}

#[cfg(not(feature = "gateway"))]
async fn serve_until_cancelled(
    _config: &CourierConfig,
    _service: Arc<NotificationService>,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    info!("built without gateway; waiting for shutdown signal");
    cancel.cancelled().await;
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_every_enabled_builtin() {
        let config = CourierConfig::default();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), builtin_channel_types().len());
    }

    #[test]
    #[cfg(all(feature = "email", feature = "sms"))]
    fn disabled_types_are_skipped() {
        let config = courier_config::load_and_validate_str("[channel_types]\nsms = false\n").unwrap();
        let names = build_registry(&config).unwrap().names();
        assert!(names.contains(&"email".to_string()));
        assert!(!names.contains(&"sms".to_string()));
    }

    #[tokio::test]
    #[cfg(feature = "gateway")]
    async fn disabled_gateway_waits_for_cancel() {
        let config = courier_config::load_and_validate_str("[gateway]\nenabled = false\n").unwrap();
        let service = Arc::new(
            NotificationService::builder()
                .channels(Arc::new(courier_storage::MemoryChannelRepository::new()))
                .templates(Arc::new(courier_storage::MemoryTemplateRepository::new()))
                .messages(Arc::new(courier_storage::MemoryMessageRepository::new()))
                .registry(Arc::new(ChannelTypeRegistry::new()))
                .build()
                .unwrap(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        serve_until_cancelled(&config, service, cancel).await.unwrap();
    }
}

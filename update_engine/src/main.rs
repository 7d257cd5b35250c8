// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `updatectl`
//!
//! Composition root: parse and security-validate the CLI, load layered
//! configuration, initialize logging and metrics, then dispatch one of
//! the four operations. `attempt-update`/`reset-status`/`status` talk to
//! an in-process [`UpdateService`]; `finalize` runs the [`SlotActivator`]
//! directly against a freshly written device, outside any `Pipeline`,
//! matching the real finalizer's own invocation convention.
//!
//! A `SIGTERM`/`SIGINT`/`SIGHUP` races the dispatched command and wins
//! immediately, surfacing `UpdateError::Cancelled` through the normal
//! exit-code mapping -- the same `ShutdownCoordinator`/cancellation-token
//! pattern the pipeline's own `stop()` is modeled on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use update_engine_bootstrap::exit_code::{to_process_exit_code, ExitCode as ProcessExitCode};
use update_engine_bootstrap::platform::create_platform;
use update_engine_bootstrap::shutdown::ShutdownCoordinator;
use update_engine_bootstrap::signals::install_shutdown_handler;
use update_engine_bootstrap::{bootstrap_cli, ValidatedCommand};

use update_engine::infrastructure::adapters::{
    ImageBundledGptTool, ProcessExecutor, SysDeviceProber, UdevEspLocator, WellKnownPathVendorHook,
};
use update_engine::infrastructure::{load_engine_config, EngineConfig, EngineMetrics, StatusRepository};
use update_engine::{ActivationRequest, ControlSurface, SlotActivator, StatusSnapshot, UpdateService};

use update_engine_domain::{DeviceProber, EspLocator, ExitCode as StageExitCode, GptTool, UpdateError, VendorHook};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("updatectl: {e}");
            return std::process::ExitCode::from(ProcessExitCode::DataErr);
        }
    };

    let config = match load_engine_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("updatectl: {e}");
            return std::process::ExitCode::from(ProcessExitCode::DataErr);
        }
    };

    update_engine::infrastructure::logging::init_logging(&config);
    let metrics = Arc::new(EngineMetrics::new());

    if let Some(bind_address) = &config.metrics_bind_address {
        let metrics_for_endpoint = metrics.clone();
        let bind_address = bind_address.clone();
        tokio::spawn(async move {
            if let Err(e) = update_engine::infrastructure::metrics::endpoint::serve(&bind_address, metrics_for_endpoint).await {
                tracing::warn!(error = %e, "metrics endpoint exited");
            }
        });
    }

    let shutdown = ShutdownCoordinator::new(Duration::from_secs(update_engine_bootstrap::shutdown::DEFAULT_GRACE_PERIOD_SECS));
    let _signal_task = install_shutdown_handler(shutdown.clone());

    let result = tokio::select! {
        result = run(cli.command, &config, metrics) => result,
        _ = shutdown.token().cancelled() => Err(UpdateError::Cancelled("received shutdown signal".to_string())),
    };
    to_process_exit_code(result, classify_error)
}

async fn run(command: ValidatedCommand, config: &EngineConfig, metrics: Arc<EngineMetrics>) -> Result<(), UpdateError> {
    match command {
        ValidatedCommand::AttemptUpdate => {
            let service = update_service(config, metrics).await?;
            print_status(&service.attempt_update().await);
            Ok(())
        }
        ValidatedCommand::ResetStatus => {
            let service = update_service(config, metrics).await?;
            print_status(&service.reset_status().await);
            Ok(())
        }
        ValidatedCommand::Status { json } => {
            let service = update_service(config, metrics).await?;
            let status = service.get_status().await;
            if json {
                println!("{}", serde_json::to_string(&StatusJson::from(&status))?);
            } else {
                print_status(&status);
            }
            Ok(())
        }
        ValidatedCommand::Finalize { device, kv } => {
            let slot = finalize(device, &kv, config).await?;
            metrics.record_activation_success();
            println!("activated slot {slot}");
            Ok(())
        }
    }
}

async fn update_service(config: &EngineConfig, metrics: Arc<EngineMetrics>) -> Result<UpdateService, UpdateError> {
    let repository = Arc::new(StatusRepository::connect(&config.status_db_path).await?);
    UpdateService::new(repository, metrics).await
}

async fn finalize(
    device: PathBuf,
    kv: &[(String, String)],
    config: &EngineConfig,
) -> Result<update_engine_domain::SlotIdentity, UpdateError> {
    let kernel_name = kv
        .iter()
        .find(|(key, _)| key == "KERNEL")
        .map(|(_, value)| value.clone())
        .ok_or_else(|| UpdateError::InvalidConfiguration("finalize requires a KERNEL=<name> argument".to_string()))?;

    let kernel_image = tokio::fs::read(PathBuf::from("/boot").join(&kernel_name))
        .await
        .map_err(|e| UpdateError::Io(e.to_string()))?;

    let executor: Arc<dyn update_engine_domain::Executor> = Arc::new(ProcessExecutor::new());
    let gpt_tool: Arc<dyn GptTool> = Arc::new(ImageBundledGptTool::new(
        executor.clone(),
        config.gpt_tool_path.clone(),
        config.gpt_tool_loader_prefix.clone(),
    ));
    let device_prober: Arc<dyn DeviceProber> = Arc::new(SysDeviceProber::new(gpt_tool.clone()));
    let esp_locator: Arc<dyn EspLocator> = Arc::new(UdevEspLocator::new(config.esp_scratch_dir.clone()));
    let platform = Arc::from(create_platform());
    let vendor_hook: Arc<dyn VendorHook> = Arc::new(WellKnownPathVendorHook::new(
        config.vendor_hook_path.clone(),
        executor,
        platform,
    ));

    let mut activator = SlotActivator::new(device_prober, esp_locator, vendor_hook, gpt_tool, config.legacy_bootloader_marker.clone());

    let (code, output) = activator
        .run(ActivationRequest {
            target_device: device.to_string_lossy().to_string(),
            kernel_image,
        })
        .await;

    match code {
        StageExitCode::Success => Ok(output.expect("Success always carries the activated slot")),
        StageExitCode::Failed(e) => Err(e),
    }
}

fn print_status(status: &StatusSnapshot) {
    println!("state:            {}", status.current_state_string);
    println!("progress:         {:.1}%", status.progress_fraction * 100.0);
    println!("last checked:     {}", status.last_checked_unix_s);
    if let Some(version) = &status.new_version {
        println!("new version:      {version}");
    }
    if let Some(size) = status.new_size_bytes {
        println!("new size (bytes): {size}");
    }
}

#[derive(serde::Serialize)]
struct StatusJson {
    last_checked_unix_s: i64,
    progress_fraction: f64,
    current_state_string: String,
    new_version: Option<String>,
    new_size_bytes: Option<u64>,
}

impl From<&StatusSnapshot> for StatusJson {
    fn from(s: &StatusSnapshot) -> Self {
        Self {
            last_checked_unix_s: s.last_checked_unix_s,
            progress_fraction: s.progress_fraction,
            current_state_string: s.current_state_string.clone(),
            new_version: s.new_version.clone(),
            new_size_bytes: s.new_size_bytes,
        }
    }
}

/// Map the engine's internal error taxonomy onto the small, stable set of
/// process exit codes external callers (the installer, a systemd unit)
/// may match on.
fn classify_error(error: &UpdateError) -> ProcessExitCode {
    match error {
        UpdateError::Cancelled(_) => ProcessExitCode::Cancelled,
        UpdateError::SlotResolutionError(_) | UpdateError::DownloadSizeMismatch { .. } | UpdateError::DownloadHashMismatch { .. } => {
            ProcessExitCode::DataErr
        }
        UpdateError::EspNotFound => ProcessExitCode::NoInput,
        UpdateError::InvalidConfiguration(_) => ProcessExitCode::DataErr,
        UpdateError::DownloadTransportError(_) | UpdateError::DownloadWriteError(_) | UpdateError::PersistenceError(_) => {
            ProcessExitCode::Unavailable
        }
        UpdateError::ActivationError(_) | UpdateError::HookError(_) | UpdateError::Io(_) | UpdateError::Serialization(_) => {
            ProcessExitCode::Software
        }
    }
}

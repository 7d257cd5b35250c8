// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics
//!
//! A small `prometheus` registry: bytes downloaded,
//! current service state as a gauge-per-state, activation success/failure
//! counters, and a download duration histogram. Exposed over HTTP by
//! [`crate::infrastructure::metrics::endpoint::serve`] when
//! [`EngineConfig::metrics_bind_address`](crate::infrastructure::config::EngineConfig)
//! is set; otherwise the registry exists but nothing binds a port, which
//! is the default in tests.

pub mod endpoint;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};

pub struct EngineMetrics {
    pub registry: Registry,
    pub bytes_downloaded_total: IntCounter,
    pub service_state: IntGaugeVec,
    pub activation_results_total: IntCounterVec,
    pub download_duration_seconds: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bytes_downloaded_total = IntCounter::new(
            "update_engine_bytes_downloaded_total",
            "Total bytes received across all download attempts",
        )
        .expect("metric name and help text are valid");

        let service_state = IntGaugeVec::new(
            Opts::new("update_engine_service_state", "1 if the service is currently in this state, else 0"),
            &["state"],
        )
        .expect("metric name and help text are valid");

        let activation_results_total = IntCounterVec::new(
            Opts::new("update_engine_activation_results_total", "Slot activation outcomes"),
            &["result"],
        )
        .expect("metric name and help text are valid");

        let download_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "update_engine_download_duration_seconds",
            "Wall-clock duration of a completed download stage run",
        ))
        .expect("metric name and help text are valid");

        registry
            .register(Box::new(bytes_downloaded_total.clone()))
            .expect("metric is registered exactly once");
        registry
            .register(Box::new(service_state.clone()))
            .expect("metric is registered exactly once");
        registry
            .register(Box::new(activation_results_total.clone()))
            .expect("metric is registered exactly once");
        registry
            .register(Box::new(download_duration_seconds.clone()))
            .expect("metric is registered exactly once");

        Self {
            registry,
            bytes_downloaded_total,
            service_state,
            activation_results_total,
            download_duration_seconds,
        }
    }

    /// Record which single state the service is currently in, zeroing
    /// every other known state's gauge.
    pub fn set_current_state(&self, state_name: &str) {
        for known in [
            "idle",
            "checking-for-update",
            "update-available",
            "downloading",
            "verifying",
            "finalizing",
            "updated-need-reboot",
            "reporting-error",
        ] {
            self.service_state
                .with_label_values(&[known])
                .set(if known == state_name { 1 } else { 0 });
        }
    }

    pub fn record_activation_success(&self) {
        self.activation_results_total.with_label_values(&["success"]).inc();
    }

    pub fn record_activation_failure(&self) {
        self.activation_results_total.with_label_values(&["failure"]).inc();
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_every_metric_without_panicking() {
        let metrics = EngineMetrics::new();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn set_current_state_is_exclusive() {
        let metrics = EngineMetrics::new();
        metrics.set_current_state("downloading");
        assert_eq!(metrics.service_state.with_label_values(&["downloading"]).get(), 1);
        assert_eq!(metrics.service_state.with_label_values(&["idle"]).get(), 0);

        metrics.set_current_state("idle");
        assert_eq!(metrics.service_state.with_label_values(&["downloading"]).get(), 0);
        assert_eq!(metrics.service_state.with_label_values(&["idle"]).get(), 1);
    }

    #[test]
    fn activation_counters_increment_independently() {
        let metrics = EngineMetrics::new();
        metrics.record_activation_success();
        metrics.record_activation_success();
        metrics.record_activation_failure();

        assert_eq!(metrics.activation_results_total.with_label_values(&["success"]).get(), 2);
        assert_eq!(metrics.activation_results_total.with_label_values(&["failure"]).get(), 1);
    }
}

// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Minimal HTTP endpoint exposing the Prometheus text-format scrape at
//! `/metrics`, bound to [`EngineConfig::metrics_bind_address`] when set.
//!
//! [`EngineConfig::metrics_bind_address`]: crate::infrastructure::config::EngineConfig

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use prometheus::{Encoder, TextEncoder};
use update_engine_domain::UpdateError;

use super::EngineMetrics;

/// Serve `/metrics` on `bind_address` until the process exits. Intended
/// to be `tokio::spawn`ed from `main`; any other path returns `404`.
pub async fn serve(bind_address: &str, metrics: Arc<EngineMetrics>) -> Result<(), UpdateError> {
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|e| UpdateError::Io(format!("binding metrics endpoint on {bind_address}: {e}")))?;

    tracing::info!(bind_address, "metrics endpoint listening");

    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| UpdateError::Io(format!("accepting metrics connection: {e}")))?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            // Best-effort read of the request line is enough for this
            // internal-only scrape endpoint.
            let _ = stream.read(&mut buf).await;
            let request_line = String::from_utf8_lossy(&buf);

            let body = if request_line.starts_with("GET /metrics") {
                let encoder = TextEncoder::new();
                let metric_families = metrics.registry.gather();
                let mut buffer = Vec::new();
                encoder.encode(&metric_families, &mut buffer).expect("encoding never fails for valid metrics");
                buffer
            } else {
                Vec::new()
            };

            let status_line = if body.is_empty() { "HTTP/1.1 404 Not Found" } else { "HTTP/1.1 200 OK" };
            let response = format!(
                "{status_line}\r\nContent-Length: {}\r\nContent-Type: text/plain; version=0.0.4\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.write_all(&body).await;
        });
    }
}

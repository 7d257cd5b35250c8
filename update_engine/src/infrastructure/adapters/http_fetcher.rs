// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `reqwest`-backed [`HttpFetcher`]:
//! resumable ranged GET, chunked to `CHUNK_MAX`, cancellable between reads.

use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use update_engine_domain::{FetcherDelegate, HttpFetcher, CHUNK_MAX};

/// Production fetcher bound to one URL for the duration of one transfer.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    url: String,
    offset: u64,
    terminated: Arc<AtomicBool>,
}

impl ReqwestFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(30))
    }

    pub fn with_timeout(url: impl Into<String>, connect_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            client,
            url: url.into(),
            offset: 0,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

}

#[async_trait::async_trait]
impl HttpFetcher for ReqwestFetcher {
    fn set_offset(&mut self, n: u64) {
        self.offset = n;
    }

    async fn begin(&mut self, delegate: &mut dyn FetcherDelegate) {
        let mut request = self.client.get(&self.url);
        if self.offset > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", self.offset));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(_) => {
                delegate.on_transfer_complete(false);
                return;
            }
        };

        if !response.status().is_success() {
            delegate.on_transfer_complete(false);
            return;
        }

        let mut offset = self.offset;
        let mut pending = Vec::with_capacity(CHUNK_MAX);
        let mut stream = response.bytes_stream();

        loop {
            if self.terminated.load(Ordering::SeqCst) {
                delegate.on_transfer_terminated();
                return;
            }

            match stream.next().await {
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(&bytes);
                    while pending.len() >= CHUNK_MAX {
                        let chunk: Vec<u8> = pending.drain(..CHUNK_MAX).collect();
                        delegate.on_chunk(offset, &chunk);
                        offset += chunk.len() as u64;
                    }
                }
                Some(Err(_)) => {
                    delegate.on_transfer_complete(false);
                    return;
                }
                None => break,
            }
        }

        if self.terminated.load(Ordering::SeqCst) {
            delegate.on_transfer_terminated();
            return;
        }

        if !pending.is_empty() {
            delegate.on_chunk(offset, &pending);
        }

        delegate.on_transfer_complete(true);
    }

    fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn termination_handle(&self) -> Arc<AtomicBool> {
        self.terminated.clone()
    }
}

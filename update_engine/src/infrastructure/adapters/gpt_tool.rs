// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`GptTool`] implementation: shells out to the
//! image-bundled GPT tool through an [`Executor`], one invocation per
//! operation, exactly as the finalizer's argv contract describes.

use async_trait::async_trait;
use std::sync::Arc;

use update_engine_domain::{ExecRequest, Executor, GptTool, UpdateError, GptSlotAttributes};

pub struct ImageBundledGptTool {
    executor: Arc<dyn Executor>,
    tool_path: String,
    loader_prefix: Option<String>,
}

impl ImageBundledGptTool {
    pub fn new(executor: Arc<dyn Executor>, tool_path: impl Into<String>, loader_prefix: Option<String>) -> Self {
        Self {
            executor,
            tool_path: tool_path.into(),
            loader_prefix,
        }
    }

    fn request(&self, args: Vec<String>) -> ExecRequest {
        let request = ExecRequest::new(self.tool_path.clone(), args);
        match &self.loader_prefix {
            Some(prefix) => request.with_loader_prefix(prefix.clone()),
            None => request,
        }
    }
}

#[async_trait]
impl GptTool for ImageBundledGptTool {
    async fn repair(&self, device: &str) -> Result<(), UpdateError> {
        let outcome = self
            .executor
            .run(self.request(vec!["repair".to_string(), device.to_string()]))
            .await?;
        if !outcome.success() {
            return Err(UpdateError::ActivationError(format!(
                "gpt repair {device} failed: {}",
                outcome.stderr
            )));
        }
        Ok(())
    }

    async fn set_attrs(&self, device: &str, tries: u8, successful: bool) -> Result<(), UpdateError> {
        let outcome = self
            .executor
            .run(self.request(vec![
                "add".to_string(),
                format!("-S{}", successful as u8),
                format!("-T{tries}"),
                device.to_string(),
            ]))
            .await?;
        if !outcome.success() {
            return Err(UpdateError::ActivationError(format!(
                "gpt add attrs on {device} failed: {}",
                outcome.stderr
            )));
        }
        Ok(())
    }

    async fn prioritize(&self, device: &str, peer_priority: u8) -> Result<(), UpdateError> {
        let new_priority = GptSlotAttributes::activated_over(peer_priority).priority;
        let outcome = self
            .executor
            .run(self.request(vec![
                "prioritize".to_string(),
                format!("-P{new_priority}"),
                device.to_string(),
            ]))
            .await?;
        if !outcome.success() {
            return Err(UpdateError::ActivationError(format!(
                "gpt prioritize {device} failed: {}",
                outcome.stderr
            )));
        }
        Ok(())
    }

    async fn show(&self, device: &str) -> Result<String, UpdateError> {
        let outcome = self
            .executor
            .run(self.request(vec!["show".to_string(), device.to_string()]))
            .await?;
        if !outcome.success() {
            return Err(UpdateError::ActivationError(format!(
                "gpt show {device} failed: {}",
                outcome.stderr
            )));
        }
        Ok(outcome.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use update_engine_domain::ExecOutcome;

    struct FakeExecutor {
        requests: Mutex<Vec<ExecRequest>>,
        outcome: ExecOutcome,
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn run(&self, request: ExecRequest) -> Result<ExecOutcome, UpdateError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.outcome.clone())
        }
    }

    #[tokio::test]
    async fn set_attrs_passes_the_finalizer_argv_shape() {
        let fake = Arc::new(FakeExecutor {
            requests: Mutex::new(Vec::new()),
            outcome: ExecOutcome { exit_code: 0, stdout: String::new(), stderr: String::new() },
        });
        let tool = ImageBundledGptTool::new(fake.clone(), "/sysroot/bin/gpt", None);

        tool.set_attrs("/dev/sda3", 1, false).await.unwrap();

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].args, vec!["add", "-S0", "-T1", "/dev/sda3"]);
    }

    #[tokio::test]
    async fn nonzero_exit_becomes_activation_error() {
        let fake = Arc::new(FakeExecutor {
            requests: Mutex::new(Vec::new()),
            outcome: ExecOutcome { exit_code: 1, stdout: String::new(), stderr: "boom".to_string() },
        });
        let tool = ImageBundledGptTool::new(fake, "/sysroot/bin/gpt", None);

        let err = tool.repair("/dev/sda3").await.unwrap_err();
        assert!(matches!(err, UpdateError::ActivationError(_)));
    }

    #[tokio::test]
    async fn prioritize_raises_above_peer_using_domain_arithmetic() {
        let fake = Arc::new(FakeExecutor {
            requests: Mutex::new(Vec::new()),
            outcome: ExecOutcome { exit_code: 0, stdout: String::new(), stderr: String::new() },
        });
        let tool = ImageBundledGptTool::new(fake.clone(), "/sysroot/bin/gpt", None);

        tool.prioritize("/dev/sda3", 3).await.unwrap();

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests[0].args[1], "-P4");
    }
}

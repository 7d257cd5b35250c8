// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline
//!
//! An ordered list of [`Stage`]s with typed hand-off between adjacent
//! stages. Every operation the service performs (check, download, verify,
//! activate) is modeled as one stage, so progress, cancellation, and
//! error surfacing are handled once, here, rather than once per operation.
//!
//! Stages are heterogeneous (a download stage's output type has nothing
//! to do with an activation stage's input type in general), so hand-off
//! uses a type-erased "output slot": [`enqueue`](Pipeline::enqueue) checks
//! that a new stage's input type matches the previous stage's output type
//! using [`std::any::TypeId`], rejecting a mis-bonded pipeline at
//! construction rather than at run. [`start`](Pipeline::start) then drives
//! the stages sequentially, downcasting the erased value back to its
//! concrete type at each hand-off -- a downcast that cannot fail, because
//! `enqueue` already proved the types line up.

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::stage::{ExitCode, Stage};

/// Error returned by [`Pipeline::enqueue`] or [`Pipeline::start`] when a
/// stage's declared input type does not match the type it would actually
/// receive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BondError {
    #[error("stage input type does not match predecessor output type")]
    TypeMismatch,
    #[error("pipeline is empty")]
    Empty,
}

type Erased = Box<dyn Any + Send>;

#[async_trait]
trait ErasedStage: Send {
    fn input_type(&self) -> TypeId;
    fn output_type(&self) -> TypeId;
    async fn run_erased(&mut self, input: Erased) -> (ExitCode, Option<Erased>);
    fn request_stop(&mut self);
}

struct StageAdapter<S: Stage>(S);

#[async_trait]
impl<S: Stage> ErasedStage for StageAdapter<S> {
    fn input_type(&self) -> TypeId {
        TypeId::of::<S::Input>()
    }

    fn output_type(&self) -> TypeId {
        TypeId::of::<S::Output>()
    }

    async fn run_erased(&mut self, input: Erased) -> (ExitCode, Option<Erased>) {
        let typed_input = *input
            .downcast::<S::Input>()
            .expect("enqueue() already proved this stage's input type matches");
        let (code, output) = self.0.run(typed_input).await;
        (code, output.map(|o| Box::new(o) as Erased))
    }

    fn request_stop(&mut self) {
        self.0.request_stop();
    }
}

/// Receives lifecycle callbacks as the pipeline runs. Calls are made from
/// within [`Pipeline::start`]'s driving task, in order, never concurrently.
pub trait PipelineDelegate: Send {
    /// A stage finished, with the exit code it produced.
    fn on_stage_complete(&mut self, stage_index: usize, code: &ExitCode);
    /// The pipeline reached a terminal state without being stopped.
    fn on_pipeline_done(&mut self, final_code: &ExitCode);
    /// `stop()` was honored: the active stage aborted and no further
    /// stages will run.
    fn on_pipeline_stopped(&mut self);
}

/// An ordered sequence of type-erased stages, driven one at a time.
///
/// Invariants: at most one stage is `running` at a time; a stage is
/// started only after its predecessor completed with [`ExitCode::Success`];
/// on any other completion, all later stages are skipped and the
/// pipeline terminates with that code.
pub struct Pipeline {
    stages: Vec<Box<dyn ErasedStage>>,
    running_index: Option<usize>,
    stop_requested: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            running_index: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append a stage. Rejects the pipeline at construction if this
    /// stage's input type doesn't match the previous stage's output type.
    pub fn enqueue<S>(&mut self, stage: S) -> Result<(), BondError>
    where
        S: Stage + 'static,
    {
        let adapter = StageAdapter(stage);
        if let Some(last) = self.stages.last() {
            if last.output_type() != adapter.input_type() {
                return Err(BondError::TypeMismatch);
            }
        }
        self.stages.push(Box::new(adapter));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running_index.is_some()
    }

    /// The cancellation flag `stop()` sets. Share this `Arc` with a stage
    /// at construction time so the stage's own `run` can check it at its
    /// suspension points, rather than relying solely on the
    /// between-stages check `start` performs.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// Request cooperative cancellation. Idempotent. The currently active
    /// stage is asked to abort; once it reports completion (with any
    /// code), `start` emits [`PipelineDelegate::on_pipeline_stopped`] and
    /// returns.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Drive every stage to completion, starting with `seed` as the first
    /// stage's input. `Seed`'s type must match the first stage's declared
    /// input type, or this returns [`BondError::TypeMismatch`] without
    /// running anything.
    pub async fn start<Seed: Any + Send + 'static>(
        &mut self,
        seed: Seed,
        delegate: &mut dyn PipelineDelegate,
    ) -> Result<ExitCode, BondError> {
        let first = self.stages.first().ok_or(BondError::Empty)?;
        if first.input_type() != TypeId::of::<Seed>() {
            return Err(BondError::TypeMismatch);
        }

        let mut current: Erased = Box::new(seed);
        let mut final_code = ExitCode::Success;

        for (index, stage) in self.stages.iter_mut().enumerate() {
            self.running_index = Some(index);
            let (code, output) = stage.run_erased(current).await;
            self.running_index = None;
            delegate.on_stage_complete(index, &code);

            if self.stop_requested.load(Ordering::SeqCst) {
                delegate.on_pipeline_stopped();
                return Ok(code);
            }

            match code {
                ExitCode::Success => match output {
                    Some(next) => current = next,
                    None => {
                        final_code = ExitCode::Success;
                        break;
                    }
                },
                non_success => {
                    final_code = non_success;
                    delegate.on_pipeline_done(&final_code);
                    return Ok(final_code);
                }
            }
        }

        delegate.on_pipeline_done(&final_code);
        Ok(final_code)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

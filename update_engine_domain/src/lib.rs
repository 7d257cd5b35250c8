// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Update Engine Domain
//!
//! The pure, I/O-free core of the A/B update engine: the install plan,
//! slot identity and GPT attribute value objects, the generic pipeline
//! and stage entities, the hash calculator, and the error taxonomy every
//! layer above this one reports through.
//!
//! Nothing in this crate touches the network, the filesystem, or a block
//! device. Infrastructure ports for the things that do (the HTTP
//! fetcher, the file writer, the GPT tool, the vendor hook) are traits
//! defined here but implemented in the `update-engine` crate, following
//! a conventional domain/infrastructure split.

pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{BondError, ExitCode, Pipeline, PipelineDelegate, Stage};
pub use error::{ErrorCategory, UpdateError};
pub use ports::{
    DeviceProber, EspLocator, ExecOutcome, ExecRequest, Executor, FetcherDelegate, FileWriter, GptTool, HttpFetcher,
    MountedEsp, UpdateChecker, VendorHook,
};
pub use services::{HashCalculator, Sha256Calculator};
pub use value_objects::{ByteChunk, ChunkSequence, GptSlotAttributes, InstallPlan, ServiceState, SlotIdentity, CHUNK_MAX, MAX_PRIORITY};

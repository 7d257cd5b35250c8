// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! I/O-bound capability interfaces. Every
//! collaborator the core describes only by contract -- the HTTP transport,
//! the sink, the GPT tool, the vendor hook, block-device probing -- is a
//! trait here. `update-engine` provides the production implementations;
//! tests provide fakes.

pub mod device_prober;
pub mod esp_locator;
pub mod executor;
pub mod file_writer;
pub mod gpt_tool;
pub mod http_fetcher;
pub mod update_checker;
pub mod vendor_hook;

pub use device_prober::DeviceProber;
pub use esp_locator::{EspLocator, MountedEsp};
pub use executor::{ExecOutcome, ExecRequest, Executor};
pub use file_writer::FileWriter;
pub use gpt_tool::GptTool;
pub use http_fetcher::{FetcherDelegate, HttpFetcher};
pub use update_checker::UpdateChecker;
pub use vendor_hook::VendorHook;

// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete pipeline stages. Currently just the download stage; the
//! slot activator lives at `application::slot_activator` since
//! it is also invoked directly from the `finalize` CLI path, outside any
//! `Pipeline`.

pub mod download_stage;

pub use download_stage::{DownloadStage, DownloadStageDelegate};

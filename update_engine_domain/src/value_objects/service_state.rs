// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The top-level service state. Pure data: the transition rules live
//! in `update-engine`'s `UpdateService`.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceState {
    Idle,
    CheckingForUpdate,
    UpdateAvailable { version: String },
    Downloading { received: u64, total: u64 },
    Verifying,
    Finalizing,
    UpdatedNeedReboot,
    ReportingError { kind: ErrorCategory },
}

impl ServiceState {
    /// The `current_state_string` field of `GetStatus`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Idle => "idle",
            ServiceState::CheckingForUpdate => "checking-for-update",
            ServiceState::UpdateAvailable { .. } => "update-available",
            ServiceState::Downloading { .. } => "downloading",
            ServiceState::Verifying => "verifying",
            ServiceState::Finalizing => "finalizing",
            ServiceState::UpdatedNeedReboot => "updated-need-reboot",
            ServiceState::ReportingError { .. } => "reporting-error",
        }
    }

    /// `progress_fraction` of `GetStatus`: `0.0` outside `Downloading`,
    /// `received / total` (saturating at `1.0`) while downloading.
    pub fn progress_fraction(&self) -> f64 {
        match self {
            ServiceState::Downloading { received, total } if *total > 0 => {
                (*received as f64 / *total as f64).min(1.0)
            }
            ServiceState::Downloading { .. } => 0.0,
            ServiceState::UpdatedNeedReboot => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ServiceState::Idle)
    }
}

impl Serialize for ErrorCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Integrity => "integrity",
            ErrorCategory::Cancellation => "cancellation",
            ErrorCategory::Activation => "activation",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Persistence => "persistence",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for ErrorCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "transport" => Ok(ErrorCategory::Transport),
            "integrity" => Ok(ErrorCategory::Integrity),
            "cancellation" => Ok(ErrorCategory::Cancellation),
            "activation" => Ok(ErrorCategory::Activation),
            "configuration" => Ok(ErrorCategory::Configuration),
            "persistence" => Ok(ErrorCategory::Persistence),
            other => Err(serde::de::Error::custom(format!("unknown error category {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloading_progress_is_a_fraction() {
        let state = ServiceState::Downloading { received: 50, total: 200 };
        assert_eq!(state.progress_fraction(), 0.25);
    }

    #[test]
    fn idle_has_zero_progress() {
        assert_eq!(ServiceState::Idle.progress_fraction(), 0.0);
    }

    #[test]
    fn as_str_matches_the_wire_state_string() {
        assert_eq!(ServiceState::Idle.as_str(), "idle");
        assert_eq!(
            ServiceState::ReportingError { kind: ErrorCategory::Transport }.as_str(),
            "reporting-error"
        );
    }

    #[test]
    fn error_category_round_trips_through_json() {
        let json = serde_json::to_string(&ErrorCategory::Activation).unwrap();
        let back: ErrorCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCategory::Activation);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observed lifecycle state of a microvm.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The lifecycle phase of a microvm, as observed by the reconciling
/// controller.
///
/// A microvm moves from `Pending` to `Running` and ends in either `Failed` or
/// `Deleted`. `Unknown` is not a phase a microvm transitions into; it is
/// reported when the observed status could not be mapped to any of the
/// others. Deserializing an unrecognized state name also yields `Unknown`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Serialize,
    JsonSchema,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum VmState {
    /// The microvm hasn't been started.
    Pending,
    /// The microvm is running.
    Running,
    /// The microvm has failed.
    Failed,
    /// The microvm has been deleted.
    Deleted,
    /// The microvm is in a state that could not be determined.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Status names and codes reported by the provisioning service (and this
/// enum's own names), mapped to the state they denote.
const STATUS_TABLE: &[(&str, VmState)] = &[
    ("pending", VmState::Pending),
    ("running", VmState::Running),
    ("failed", VmState::Failed),
    ("deleted", VmState::Deleted),
    ("unknown", VmState::Unknown),
    ("created", VmState::Running),
    ("deleting", VmState::Deleted),
    ("0", VmState::Pending),
    ("1", VmState::Running),
    ("2", VmState::Failed),
    ("3", VmState::Deleted),
];

impl VmState {
    pub const ALL: [VmState; 5] = [
        Self::Pending,
        Self::Running,
        Self::Failed,
        Self::Deleted,
        Self::Unknown,
    ];

    /// Maps an externally observed status name or numeric code to a state.
    ///
    /// This never fails: anything unrecognized (including the empty string)
    /// is classified as [`VmState::Unknown`], so the controller always has a
    /// state to act on. Matching ignores case and surrounding whitespace.
    pub fn classify(status: &str) -> Self {
        let status = status.trim();
        STATUS_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(status))
            .map(|(_, state)| *state)
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for states a microvm never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Deleted)
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmState {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}

impl From<&str> for VmState {
    fn from(status: &str) -> Self {
        Self::classify(status)
    }
}

/// A classified state paired with the name of the resource it was observed
/// for. Nothing in a [`crate::VmSpec`] identifies the microvm it describes, so
/// the controller supplies the correlating name.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VmObservation {
    pub name: String,
    pub state: VmState,
}

impl VmObservation {
    pub fn new(name: impl Into<String>, status: &str) -> Self {
        Self { name: name.into(), state: VmState::classify(status) }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Definitions for the microvm workload schema: the desired [`VmSpec`] an
//! operator or controller submits, and the [`VmState`] reported back once the
//! provisioning service has acted on it.
//!
//! This crate holds data and pure functions only. Submitting specs to a
//! provisioning service and polling it for status belong to the controller
//! that consumes these types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod state;
pub mod validate;
pub mod vm_spec;

pub use microvm_types::{MacAddr, MacAddrParseError};
pub use state::{VmObservation, VmState};
pub use validate::{ValidationError, Violation, ViolationKind};
pub use vm_spec::{
    ContainerFileSource, IfaceType, NetworkInterface, UnknownIfaceType,
    VmSpec, Volume,
};

/// A host running the microvm provisioning service.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Host {
    /// An optional name for the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The API endpoint of the provisioning service, including the port.
    pub endpoint: String,
}

impl Host {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { name: None, endpoint: endpoint.into() }
    }
}

/// Public keys to authorize for a guest user.
#[derive(
    Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SshPublicKey {
    /// The name of the user to add keys for (e.g. root, ubuntu).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    /// The public keys to add for the user. Duplicates are passed through.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorized_keys: Vec<String>,
}

/// Returns the JSON schema describing a [`VmSpec`].
pub fn vm_spec_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(VmSpec)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The desired specification of a microvm.
//!
//! A [`VmSpec`] is handed, once validated, to the provisioning service as the
//! request payload for creating a microvm. It exclusively owns its volumes,
//! boot artifacts and network interfaces.
//!
//! # Wire format
//!
//! Specs serialize to objects with camelCase field names. Optional fields
//! that are unset (or empty collections) are omitted rather than emitted as
//! null, and are reconstructed as unset when deserialized.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod components;

pub use components::{
    ContainerFileSource, IfaceType, NetworkInterface, UnknownIfaceType, Volume,
};

/// Configuration for a microvm, passed on to the VMM by the provisioning
/// service.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VmSpec {
    /// The name of the microvm provider to use. The provisioning service's
    /// default provider is used if this isn't supplied; that default is
    /// chosen by whoever operates the remote host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// How many vCPUs the microvm will be allocated.
    #[schemars(range(min = 1))]
    pub vcpu: u32,

    /// The amount of memory, in megabytes, that the microvm will be
    /// allocated.
    #[schemars(range(min = 1024))]
    pub memory_mb: u64,

    /// The volume to use as the root of the microvm.
    pub root_volume: Volume,

    /// Additional non-root volumes to attach to the microvm.
    #[serde(rename = "volumes", default, skip_serializing_if = "Vec::is_empty")]
    pub additional_volumes: Vec<Volume>,

    /// The kernel to boot.
    pub kernel: ContainerFileSource,

    /// Additional arguments for the kernel command line. Each provider has
    /// its own recommended arguments which it merges with these.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kernel_cmdline: BTreeMap<String, String>,

    /// An optional initial ramdisk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd: Option<ContainerFileSource>,

    /// The network interfaces attached to the microvm.
    #[schemars(length(min = 1))]
    pub network_interfaces: Vec<NetworkInterface>,

    /// Free-form metadata attached to the microvm.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl VmSpec {
    /// Creates a spec with the required fields populated and every optional
    /// field left unset.
    pub fn new(
        vcpu: u32,
        memory_mb: u64,
        root_volume: Volume,
        kernel: ContainerFileSource,
        network_interfaces: Vec<NetworkInterface>,
    ) -> Self {
        Self {
            provider: None,
            vcpu,
            memory_mb,
            root_volume,
            additional_volumes: Vec::new(),
            kernel,
            kernel_cmdline: BTreeMap::new(),
            initrd: None,
            network_interfaces,
            labels: BTreeMap::new(),
        }
    }

    /// Iterates over every volume in the spec, root volume first, along with
    /// the field path that locates it in the serialized spec.
    pub fn volumes(&self) -> impl Iterator<Item = (String, &Volume)> {
        std::iter::once(("rootVolume".to_string(), &self.root_volume)).chain(
            self.additional_volumes
                .iter()
                .enumerate()
                .map(|(i, vol)| (format!("volumes[{i}]"), vol)),
        )
    }

    /// Looks up a volume (root or additional) by its ID.
    pub fn volume(&self, id: &str) -> Option<&Volume> {
        self.volumes().map(|(_, vol)| vol).find(|vol| vol.id == id)
    }
}

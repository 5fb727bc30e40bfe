// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Component configuration data: the storage, boot artifact and network
//! device descriptions that a [`super::VmSpec`] is composed of.

use std::fmt;
use std::str::FromStr;

use microvm_types::{MacAddr, MacAddrParseError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file sourced from a container image.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContainerFileSource {
    /// The container image to use.
    pub image: String,

    /// The name of the file in the container to use. If this is not
    /// supplied, the provider picks its default file within the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ContainerFileSource {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into(), filename: None }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// A volume to be attached to a microvm.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Volume {
    /// An identifier for this volume, unique within the owning spec.
    pub id: String,

    /// The container image to use as the source for the volume.
    pub image: String,

    /// Indicates whether the volume is to be mounted read-only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,

    /// The guest mount point for the volume. Only applied to additional
    /// volumes; the root volume ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

impl Volume {
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: image.into(),
            read_only: false,
            mount_point: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }
}

/// The kind of host network interface created for a guest NIC.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Serialize,
    JsonSchema,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum IfaceType {
    /// A TAP network interface.
    Tap,
    /// A MACVTAP network interface.
    Macvtap,
}

impl IfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::Macvtap => "macvtap",
        }
    }
}

impl fmt::Display for IfaceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown interface type {0:?}, expected one of: 'tap', 'macvtap'")]
pub struct UnknownIfaceType(pub String);

impl FromStr for IfaceType {
    type Err = UnknownIfaceType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tap" => Ok(Self::Tap),
            "macvtap" => Ok(Self::Macvtap),
            _ => Err(UnknownIfaceType(s.to_owned())),
        }
    }
}

/// A network interface presented to the microvm guest.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NetworkInterface {
    /// The name of the network interface to create in the guest.
    pub guest_device_name: String,

    /// The MAC address to use for the interface. An address is generated
    /// when this is not supplied or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_mac: Option<String>,

    /// The type of host network interface to create for the guest.
    #[serde(rename = "type")]
    pub iface_type: IfaceType,

    /// A static IP address to assign to this interface. DHCP is used when
    /// this is not supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl NetworkInterface {
    pub fn new(
        guest_device_name: impl Into<String>,
        iface_type: IfaceType,
    ) -> Self {
        Self {
            guest_device_name: guest_device_name.into(),
            guest_mac: None,
            iface_type,
            address: None,
        }
    }

    pub fn with_guest_mac(mut self, mac: impl Into<String>) -> Self {
        self.guest_mac = Some(mac.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Parses the requested guest MAC address, if one was supplied. A blank
    /// address counts as not supplied.
    pub fn mac_addr(&self) -> Result<Option<MacAddr>, MacAddrParseError> {
        self.guest_mac
            .as_deref()
            .filter(|mac| !mac.trim().is_empty())
            .map(MacAddr::from_str)
            .transpose()
    }
}

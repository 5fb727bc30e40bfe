// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fundamental types shared by other microvm crates.
//!
//! This crate defines some basic types that are shared by the schema, config
//! and CLI crates such that they can all use those types (and implement their
//! own conversions to/from them) without any layering oddities.

use std::fmt::Display;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MAC_ADDR_OCTETS: usize = 6;

/// Errors produced when parsing a [`MacAddr`] from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MacAddrParseError {
    #[error("expected 6 colon-separated octets, got {0}")]
    WrongOctetCount(usize),

    #[error("octet {0:?} is not two hexadecimal digits")]
    InvalidOctet(String),
}

/// An Ethernet MAC address. Supports conversion from a string formatted as
/// six colon-separated hexadecimal octets, e.g. "aa:bb:cc:00:11:22".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MacAddr([u8; MAC_ADDR_OCTETS]);

impl MacAddr {
    pub const fn new(octets: [u8; MAC_ADDR_OCTETS]) -> Self {
        Self(octets)
    }

    #[inline]
    pub fn octets(&self) -> [u8; MAC_ADDR_OCTETS] {
        self.0
    }

    /// Returns true if the group bit (least significant bit of the first
    /// octet) is set.
    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Returns true if the address is locally administered rather than
    /// vendor assigned.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl From<[u8; MAC_ADDR_OCTETS]> for MacAddr {
    fn from(octets: [u8; MAC_ADDR_OCTETS]) -> Self {
        Self(octets)
    }
}

impl FromStr for MacAddr {
    type Err = MacAddrParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.split(':').collect();
        if groups.len() != MAC_ADDR_OCTETS {
            return Err(MacAddrParseError::WrongOctetCount(groups.len()));
        }

        let mut octets = [0u8; MAC_ADDR_OCTETS];
        for (octet, group) in octets.iter_mut().zip(groups) {
            // `from_str_radix` tolerates a leading '+', so check the digits
            // up front.
            if group.len() != 2
                || !group.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(MacAddrParseError::InvalidOctet(group.to_owned()));
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| {
                MacAddrParseError::InvalidOctet(group.to_owned())
            })?;
        }

        Ok(Self(octets))
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'d> Deserialize<'d> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl JsonSchema for MacAddr {
    fn schema_name() -> String {
        "MacAddr".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        let mut schema = String::json_schema(gen).into_object();
        schema.string().pattern =
            Some("^([0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$".to_string());
        schema.into()
    }
}

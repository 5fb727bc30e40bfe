// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Admission checks for specs before they are handed to the provisioning
//! service.
//!
//! Validation is pure: it inspects a value and reports every rule the value
//! breaks in a single pass, so a caller can fix all of them before
//! resubmitting. Each [`Violation`] names the offending field by its path in
//! the serialized form (e.g. `volumes[1].id`).

use std::collections::BTreeMap;
use std::fmt;

use microvm_types::MacAddrParseError;
use thiserror::Error;

use crate::vm_spec::VmSpec;
use crate::{Host, SshPublicKey};

/// The fewest vCPUs a microvm may be allocated.
pub const MIN_VCPU: u32 = 1;

/// The least memory, in megabytes, a microvm may be allocated.
pub const MIN_MEMORY_MB: u64 = 1024;

/// The fewest network interfaces a microvm may have.
pub const MIN_NETWORK_INTERFACES: usize = 1;

/// The rule a field breaks.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ViolationKind {
    #[error("a value is required")]
    Required,

    #[error("{value} is less than the minimum of {min}")]
    BelowMinimum { value: u64, min: u64 },

    #[error("at least {min} item(s) required, found {found}")]
    TooFewItems { min: usize, found: usize },

    #[error("volume ID {id:?} is already used by {first}")]
    DuplicateVolumeId { id: String, first: String },

    #[error("guest device name {name:?} is already used by {first}")]
    DuplicateDeviceName { name: String, first: String },

    #[error("{value:?} is not a valid MAC address: {reason}")]
    InvalidMacAddress { value: String, reason: MacAddrParseError },
}

/// A single broken rule, located by field path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{field}: {kind}")]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self { field: field.into(), kind }
    }

    fn with_prefix(mut self, prefix: &str) -> Self {
        self.field = join_path(prefix, &self.field);
        match &mut self.kind {
            ViolationKind::DuplicateVolumeId { first, .. }
            | ViolationKind::DuplicateDeviceName { first, .. } => {
                *first = join_path(prefix, first);
            }
            _ => {}
        }
        self
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_owned()
    } else {
        format!("{prefix}.{path}")
    }
}

/// Every rule a value broke. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Succeeds if `violations` is empty, otherwise fails with all of them.
    pub fn check(violations: Vec<Violation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Re-roots every field path under `prefix`, for values validated as
    /// part of a larger document.
    pub fn with_prefix(self, prefix: &str) -> Self {
        Self {
            violations: self
                .violations
                .into_iter()
                .map(|v| v.with_prefix(prefix))
                .collect(),
        }
    }

    /// Returns true if some violation is reported against `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.violations.len())?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Default)]
struct Report(Vec<Violation>);

impl Report {
    fn push(&mut self, field: impl Into<String>, kind: ViolationKind) {
        self.0.push(Violation::new(field, kind));
    }

    fn require(&mut self, field: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(field, ViolationKind::Required);
        }
    }

    fn minimum(&mut self, field: &str, value: u64, min: u64) {
        if value < min {
            self.push(field, ViolationKind::BelowMinimum { value, min });
        }
    }

    fn min_items(&mut self, field: &str, found: usize, min: usize) {
        if found < min {
            self.push(field, ViolationKind::TooFewItems { min, found });
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        ValidationError::check(self.0)
    }
}

impl VmSpec {
    /// Checks this spec against the admission rules, returning every
    /// violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut report = Report::default();

        report.minimum("vcpu", self.vcpu.into(), MIN_VCPU.into());
        report.minimum("memoryMb", self.memory_mb, MIN_MEMORY_MB);

        let mut volume_ids: BTreeMap<&str, String> = BTreeMap::new();
        for (path, vol) in self.volumes() {
            report.require(format!("{path}.id"), &vol.id);
            report.require(format!("{path}.image"), &vol.image);

            if vol.id.trim().is_empty() {
                continue;
            }
            if let Some(first) = volume_ids.get(vol.id.as_str()) {
                report.push(
                    format!("{path}.id"),
                    ViolationKind::DuplicateVolumeId {
                        id: vol.id.clone(),
                        first: first.clone(),
                    },
                );
            } else {
                volume_ids.insert(&vol.id, format!("{path}.id"));
            }
        }

        report.require("kernel.image", &self.kernel.image);
        if let Some(initrd) = &self.initrd {
            report.require("initrd.image", &initrd.image);
        }

        report.min_items(
            "networkInterfaces",
            self.network_interfaces.len(),
            MIN_NETWORK_INTERFACES,
        );
        let mut device_names: BTreeMap<&str, String> = BTreeMap::new();
        for (i, nic) in self.network_interfaces.iter().enumerate() {
            let path = format!("networkInterfaces[{i}]");
            let name = nic.guest_device_name.as_str();
            report.require(format!("{path}.guestDeviceName"), name);

            if !name.trim().is_empty() {
                if let Some(first) = device_names.get(name) {
                    report.push(
                        format!("{path}.guestDeviceName"),
                        ViolationKind::DuplicateDeviceName {
                            name: name.to_owned(),
                            first: first.clone(),
                        },
                    );
                } else {
                    device_names
                        .insert(name, format!("{path}.guestDeviceName"));
                }
            }

            if let (Some(value), Err(reason)) = (&nic.guest_mac, nic.mac_addr())
            {
                report.push(
                    format!("{path}.guestMac"),
                    ViolationKind::InvalidMacAddress {
                        value: value.clone(),
                        reason,
                    },
                );
            }
        }

        report.finish()
    }
}

impl Host {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut report = Report::default();
        report.require("endpoint", &self.endpoint);
        report.finish()
    }
}

impl SshPublicKey {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut report = Report::default();
        report.require("user", &self.user);
        report.min_items("authorizedKeys", self.authorized_keys.len(), 1);
        for (i, key) in self.authorized_keys.iter().enumerate() {
            report.require(format!("authorizedKeys[{i}]"), key);
        }
        report.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm_spec::{
        ContainerFileSource, IfaceType, NetworkInterface, Volume,
    };
    use proptest::prelude::*;

    fn valid_spec() -> VmSpec {
        VmSpec::new(
            2,
            2048,
            Volume::new("root", "docker://alpine"),
            ContainerFileSource::new("docker://kernel"),
            vec![NetworkInterface::new("eth0", IfaceType::Tap)],
        )
    }

    fn kinds_for<'a>(
        err: &'a ValidationError,
        field: &str,
    ) -> Vec<&'a ViolationKind> {
        err.violations()
            .iter()
            .filter(|v| v.field == field)
            .map(|v| &v.kind)
            .collect()
    }

    #[test]
    fn accepts_minimal_spec() {
        assert_eq!(valid_spec().validate(), Ok(()));
    }

    #[test]
    fn accepts_macvtap_interfaces() {
        let mut spec = valid_spec();
        spec.network_interfaces =
            vec![NetworkInterface::new("eth0", IfaceType::Macvtap)
                .with_guest_mac("aa:bb:cc:dd:ee:ff")];
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_vcpu() {
        let mut spec = valid_spec();
        spec.vcpu = 0;
        let err = spec.validate().unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new(
                "vcpu",
                ViolationKind::BelowMinimum { value: 0, min: 1 }
            )]
        );
    }

    #[test]
    fn rejects_duplicate_root_volume_id() {
        let mut spec = valid_spec();
        spec.additional_volumes = vec![Volume::new("root", "docker://extra")];
        let err = spec.validate().unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new(
                "volumes[0].id",
                ViolationKind::DuplicateVolumeId {
                    id: "root".to_string(),
                    first: "rootVolume.id".to_string(),
                }
            )]
        );
        assert!(err.to_string().contains("\"root\""));
    }

    #[test]
    fn rejects_duplicate_additional_volume_ids() {
        let mut spec = valid_spec();
        spec.additional_volumes = vec![
            Volume::new("data", "docker://a"),
            Volume::new("logs", "docker://b"),
            Volume::new("data", "docker://c"),
        ];
        let err = spec.validate().unwrap_err();
        assert_eq!(
            kinds_for(&err, "volumes[2].id"),
            [&ViolationKind::DuplicateVolumeId {
                id: "data".to_string(),
                first: "volumes[0].id".to_string(),
            }]
        );
        assert_eq!(err.violations().len(), 1);
    }

    #[test]
    fn rejects_empty_network_interfaces() {
        let mut spec = valid_spec();
        spec.network_interfaces.clear();
        let err = spec.validate().unwrap_err();
        assert_eq!(
            kinds_for(&err, "networkInterfaces"),
            [&ViolationKind::TooFewItems { min: 1, found: 0 }]
        );
    }

    #[test]
    fn rejects_duplicate_and_empty_device_names() {
        let mut spec = valid_spec();
        spec.network_interfaces = vec![
            NetworkInterface::new("eth0", IfaceType::Tap),
            NetworkInterface::new("", IfaceType::Tap),
            NetworkInterface::new("eth0", IfaceType::Macvtap),
        ];
        let err = spec.validate().unwrap_err();
        assert_eq!(
            kinds_for(&err, "networkInterfaces[1].guestDeviceName"),
            [&ViolationKind::Required]
        );
        assert_eq!(
            kinds_for(&err, "networkInterfaces[2].guestDeviceName"),
            [&ViolationKind::DuplicateDeviceName {
                name: "eth0".to_string(),
                first: "networkInterfaces[0].guestDeviceName".to_string(),
            }]
        );
    }

    #[test]
    fn rejects_malformed_guest_mac() {
        let mut spec = valid_spec();
        spec.network_interfaces[0] =
            NetworkInterface::new("eth0", IfaceType::Tap)
                .with_guest_mac("02:00:00:00:00");
        let err = spec.validate().unwrap_err();
        assert_eq!(
            kinds_for(&err, "networkInterfaces[0].guestMac"),
            [&ViolationKind::InvalidMacAddress {
                value: "02:00:00:00:00".to_string(),
                reason: MacAddrParseError::WrongOctetCount(5),
            }]
        );
    }

    #[test]
    fn blank_guest_mac_is_autogenerated() {
        let raw = r#"{
            "vcpu": 2,
            "memoryMb": 2048,
            "rootVolume": { "id": "root", "image": "docker://alpine" },
            "kernel": { "image": "docker://kernel" },
            "networkInterfaces": [
                { "guestDeviceName": "eth0", "type": "tap", "guestMac": "" },
                { "guestDeviceName": "eth1", "type": "tap", "guestMac": " " }
            ]
        }"#;
        let spec: VmSpec = serde_json::from_str(raw).unwrap();
        assert_eq!(spec.validate(), Ok(()));
        assert_eq!(spec.network_interfaces[0].mac_addr(), Ok(None));
    }

    #[test]
    fn blank_ids_are_not_duplicates() {
        let mut spec = valid_spec();
        spec.additional_volumes = vec![
            Volume::new(" ", "docker://a"),
            Volume::new(" ", "docker://b"),
        ];
        spec.network_interfaces = vec![
            NetworkInterface::new("  ", IfaceType::Tap),
            NetworkInterface::new("  ", IfaceType::Tap),
        ];
        let err = spec.validate().unwrap_err();
        for field in [
            "volumes[0].id",
            "volumes[1].id",
            "networkInterfaces[0].guestDeviceName",
            "networkInterfaces[1].guestDeviceName",
        ] {
            assert_eq!(kinds_for(&err, field), [&ViolationKind::Required]);
        }
        assert_eq!(err.violations().len(), 4);
    }

    #[test]
    fn initrd_requires_image() {
        let mut spec = valid_spec();
        spec.initrd = Some(ContainerFileSource::new(""));
        let err = spec.validate().unwrap_err();
        assert_eq!(
            kinds_for(&err, "initrd.image"),
            [&ViolationKind::Required]
        );
        assert_eq!(err.violations().len(), 1);

        spec.initrd = Some(ContainerFileSource::new("docker://initrd"));
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn reports_every_violation_in_one_pass() {
        let spec = VmSpec::new(
            0,
            512,
            Volume::new("", ""),
            ContainerFileSource::new(""),
            Vec::new(),
        );
        let err = spec.validate().unwrap_err();
        for field in [
            "vcpu",
            "memoryMb",
            "rootVolume.id",
            "rootVolume.image",
            "kernel.image",
            "networkInterfaces",
        ] {
            assert!(err.has_field(field), "missing {field} in {err}");
        }
        assert_eq!(err.violations().len(), 6);
    }

    #[test]
    fn validation_is_repeatable() {
        let mut spec = valid_spec();
        spec.memory_mb = 1;
        assert_eq!(spec.validate(), spec.validate());
    }

    #[test]
    fn prefix_reroots_all_paths() {
        let mut spec = valid_spec();
        spec.additional_volumes = vec![Volume::new("root", "docker://extra")];
        let err = spec.validate().unwrap_err().with_prefix("vm");
        assert_eq!(
            err.violations(),
            [Violation::new(
                "vm.volumes[0].id",
                ViolationKind::DuplicateVolumeId {
                    id: "root".to_string(),
                    first: "vm.rootVolume.id".to_string(),
                }
            )]
        );
    }

    #[test]
    fn host_requires_endpoint() {
        let host =
            Host { name: Some("host-a".to_string()), endpoint: String::new() };
        let err = host.validate().unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new("endpoint", ViolationKind::Required)]
        );

        let host = Host::new("10.0.0.10:9090");
        assert_eq!(host.validate(), Ok(()));
    }

    #[test]
    fn ssh_public_key_requirements() {
        let key = SshPublicKey { user: String::new(), authorized_keys: vec![] };
        let err = key.validate().unwrap_err();
        assert!(err.has_field("user"));
        assert!(err.has_field("authorizedKeys"));

        let key = SshPublicKey {
            user: "root".to_string(),
            authorized_keys: vec![
                "ssh-ed25519 AAAA".to_string(),
                "ssh-ed25519 AAAA".to_string(),
            ],
        };
        assert_eq!(key.validate(), Ok(()));
    }

    proptest! {
        #[test]
        fn memory_below_minimum_is_rejected(memory_mb in 0u64..MIN_MEMORY_MB) {
            let mut spec = valid_spec();
            spec.memory_mb = memory_mb;
            let err = spec.validate().unwrap_err();
            prop_assert_eq!(
                err.violations(),
                &[Violation::new(
                    "memoryMb",
                    ViolationKind::BelowMinimum {
                        value: memory_mb,
                        min: MIN_MEMORY_MB,
                    },
                )][..]
            );
        }

        #[test]
        fn sizing_within_bounds_is_accepted(
            vcpu in MIN_VCPU..=u32::MAX,
            memory_mb in MIN_MEMORY_MB..=u64::MAX,
        ) {
            let mut spec = valid_spec();
            spec.vcpu = vcpu;
            spec.memory_mb = memory_mb;
            prop_assert_eq!(spec.validate(), Ok(()));
        }

        #[test]
        fn any_closed_set_interface_type_is_accepted(
            macvtap in any::<bool>(),
            name in "[a-z]{1,8}[0-9]{0,2}",
        ) {
            let iface_type =
                if macvtap { IfaceType::Macvtap } else { IfaceType::Tap };
            let mut spec = valid_spec();
            spec.network_interfaces =
                vec![NetworkInterface::new(name, iface_type)];
            prop_assert_eq!(spec.validate(), Ok(()));
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use microvm_api_types::{Host, SshPublicKey, ValidationError, VmSpec};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// A workload document: the microvm to create, the provisioning host to
/// create it on, and the keys to authorize in the guest.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub host: Option<Host>,

    #[serde(default, rename = "ssh_public_key")]
    pub ssh_public_keys: Vec<SshPublicKey>,

    pub vm: VmSpec,
}

impl Config {
    /// Validates every part of the document, reporting violations under
    /// their location in the document (`vm.vcpu`, `host.endpoint`,
    /// `ssh_public_key[0].user`).
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if let Err(e) = self.vm.validate() {
            violations.extend(e.with_prefix("vm").into_violations());
        }
        if let Some(Err(e)) = self.host.as_ref().map(Host::validate) {
            violations.extend(e.with_prefix("host").into_violations());
        }
        for (i, key) in self.ssh_public_keys.iter().enumerate() {
            if let Err(e) = key.validate() {
                let prefix = format!("ssh_public_key[{i}]");
                violations.extend(e.with_prefix(&prefix).into_violations());
            }
        }

        ValidationError::check(violations)
    }
}

/// Errors which may be returned when parsing a workload document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot parse json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a TOML file into a workload document.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Config, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let cfg = toml::from_str::<Config>(&contents)?;
    Ok(cfg)
}

/// Parses a JSON file holding a bare [`VmSpec`], in the form it is sent to
/// the provisioning service.
pub fn parse_spec_json<P: AsRef<Path>>(path: P) -> Result<VmSpec, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let spec = serde_json::from_str::<VmSpec>(&contents)?;
    Ok(spec)
}

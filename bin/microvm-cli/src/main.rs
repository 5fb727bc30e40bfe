// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use microvm_api_types::{vm_spec_schema, ValidationError, VmState};
use slog::{o, Drain, Level, Logger};

#[derive(Debug, Parser)]
#[clap(about, version)]
/// A simple CLI tool to check microvm workload documents
struct Opt {
    /// Enable debugging
    #[clap(short, long, action)]
    debug: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a workload document or a bare VM spec
    Validate {
        /// Path to the document
        #[clap(action)]
        path: PathBuf,

        /// Document format; inferred from the file extension if omitted
        #[clap(short, long, value_enum)]
        format: Option<Format>,
    },

    /// Map observed provisioning statuses to VM states
    Classify {
        /// Status names or codes, as reported by the provisioning service
        #[clap(required = true, action)]
        statuses: Vec<String>,
    },

    /// Print the JSON schema of a VM spec
    Schema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// A TOML workload document with `[vm]`, `[host]` and
    /// `[[ssh_public_key]]` sections
    Toml,
    /// A JSON VM spec, as sent to the provisioning service
    Json,
}

impl Format {
    fn infer(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Create a top-level logger that outputs to stderr
fn create_logger(opt: &Opt) -> (Logger, slog_async::AsyncGuard) {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level = if opt.debug { Level::Debug } else { Level::Info };
    let drain = slog::LevelFilter(drain, level).fuse();
    let (drain, guard) = slog_async::Async::new(drain).build_with_guard();

    (Logger::root(drain.fuse(), o!()), guard)
}

fn load_and_validate(
    path: &Path,
    format: Format,
) -> anyhow::Result<Result<(), ValidationError>> {
    let result = match format {
        Format::Toml => microvm_config_toml::parse(path)
            .with_context(|| format!("failed to parse {}", path.display()))?
            .validate(),
        Format::Json => microvm_config_toml::parse_spec_json(path)
            .with_context(|| format!("failed to parse {}", path.display()))?
            .validate(),
    };
    Ok(result)
}

fn validate(
    log: &Logger,
    path: &Path,
    format: Option<Format>,
) -> anyhow::Result<()> {
    let format = format.unwrap_or_else(|| Format::infer(path));
    slog::debug!(log, "validating document";
        "path" => %path.display(), "format" => ?format);

    match load_and_validate(path, format)? {
        Ok(()) => {
            slog::info!(log, "document is valid"; "path" => %path.display());
            println!("{}: ok", path.display());
            Ok(())
        }
        Err(e) => {
            for v in e.violations() {
                slog::warn!(log, "violation";
                    "field" => &v.field, "rule" => %v.kind);
                println!("{}: {}", path.display(), v);
            }
            Err(anyhow!("{} rejected: {}", path.display(), e))
        }
    }
}

fn classify(log: &Logger, statuses: &[String]) {
    for status in statuses {
        let state = VmState::classify(status);
        slog::debug!(log, "classified status";
            "status" => status, "state" => %state);
        if state == VmState::Unknown {
            slog::info!(log, "status could not be mapped"; "status" => status);
        }
        println!("{status}\t{state}");
    }
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    let (log, _guard) = create_logger(&opt);

    match opt.cmd {
        Command::Validate { path, format } => validate(&log, &path, format)?,
        Command::Classify { statuses } => classify(&log, &statuses),
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&vm_spec_schema())?;
            println!("{schema}");
        }
    }

    Ok(())
}

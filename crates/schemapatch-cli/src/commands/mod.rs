//! CLI commands

pub mod check;
pub mod patch;

use std::path::{Path, PathBuf};

use schemapatch_core::{CancellationToken, Config, Generator, SchemaBundle};

use crate::InputArgs;
use crate::error::{CliError, Result};

/// Flags merged over the configuration file
#[derive(Debug, Clone)]
pub struct Settings {
    pub manifests: PathBuf,
    pub schemas: Vec<PathBuf>,
    pub max_desc_len: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(
        config_path: Option<&Path>,
        input: &InputArgs,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let config = Config::load(config_path)?;

        let manifests = input.manifests.clone().or(config.manifests).ok_or_else(|| {
            CliError::usage_with_help(
                "no manifests directory given",
                "Pass --manifests or set `manifests` in schemapatch.yaml",
            )
        })?;
        let schemas = if input.schemas.is_empty() {
            config.schemas
        } else {
            input.schemas.clone()
        };
        if schemas.is_empty() {
            return Err(CliError::usage_with_help(
                "no schema bundles given",
                "Pass --schemas or set `schemas` in schemapatch.yaml",
            ));
        }

        Ok(Self {
            manifests,
            schemas,
            max_desc_len: input.max_desc_len.or(config.max_desc_len),
            output_dir: output_dir.or(config.output_dir),
        })
    }

    pub fn generator(&self, cancel: CancellationToken) -> Generator {
        Generator::new()
            .with_max_desc_len(self.max_desc_len)
            .with_cancellation(cancel)
    }

    pub fn schema_bundle(&self) -> Result<SchemaBundle> {
        let bundle = SchemaBundle::load_all(&self.schemas)?;
        tracing::debug!(
            files = self.schemas.len(),
            schemata = bundle.schemata.len(),
            "loaded schema bundles"
        );
        Ok(bundle)
    }
}

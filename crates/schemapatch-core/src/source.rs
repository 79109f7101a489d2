//! Schema suppliers
//!
//! The patcher does not generate schemata itself. A [`SchemaSource`] hands it
//! `(type, schema)` pairs and tells it which group and version each package
//! of types is served under. [`SchemaBundle`] is the file based source used
//! by the command line tool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PatchError, Result};
use crate::gvk::{GroupVersion, TypeIdent};
use crate::schema::JsonSchemaProps;

/// Supplier of generated schemata
pub trait SchemaSource {
    /// Group and version of the types in `package`
    fn group_version(&self, package: &str) -> Option<GroupVersion>;

    /// Every supplied schema; later pairs for the same type win
    fn schemata(&self) -> Box<dyn Iterator<Item = (TypeIdent, &JsonSchemaProps)> + '_>;
}

/// One schema of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Package the type lives in
    pub package: String,
    /// Type name, which is also the CRD kind
    pub name: String,
    pub schema: JsonSchemaProps,
}

/// A YAML or JSON file of generated schemata
///
/// ```yaml
/// groupVersions:
///   example.io/api/v1: {group: example.io, version: v1}
/// schemata:
///   - package: example.io/api/v1
///     name: Widget
///     schema: {type: object}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBundle {
    #[serde(default)]
    pub group_versions: BTreeMap<String, GroupVersion>,
    #[serde(default)]
    pub schemata: Vec<BundleEntry>,
}

impl SchemaBundle {
    /// Parse a bundle from YAML or JSON text
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load a bundle file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PatchError::io(path, e))?;
        Self::parse(&content).map_err(|e| {
            PatchError::config(format!("invalid schema bundle {}: {}", path.display(), e))
        })
    }

    /// Load and merge several bundle files, in order
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut bundle = Self::default();
        for path in paths {
            bundle.merge(Self::load(path.as_ref())?);
        }
        Ok(bundle)
    }

    /// Fold `other` into this bundle; its entries win
    pub fn merge(&mut self, other: SchemaBundle) {
        self.group_versions.extend(other.group_versions);
        self.schemata.extend(other.schemata);
    }

    /// Add a package mapping
    pub fn with_group_version(mut self, package: impl Into<String>, gv: GroupVersion) -> Self {
        self.group_versions.insert(package.into(), gv);
        self
    }

    /// Add a schema
    pub fn with_schema(
        mut self,
        package: impl Into<String>,
        name: impl Into<String>,
        schema: JsonSchemaProps,
    ) -> Self {
        self.schemata.push(BundleEntry {
            package: package.into(),
            name: name.into(),
            schema,
        });
        self
    }
}

impl SchemaSource for SchemaBundle {
    fn group_version(&self, package: &str) -> Option<GroupVersion> {
        self.group_versions.get(package).cloned()
    }

    fn schemata(&self) -> Box<dyn Iterator<Item = (TypeIdent, &JsonSchemaProps)> + '_> {
        Box::new(
            self.schemata
                .iter()
                .map(|entry| (TypeIdent::new(&entry.package, &entry.name), &entry.schema)),
        )
    }
}

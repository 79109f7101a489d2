//! Loading CRD manifests from a directory
//!
//! Files are identified in two passes. A shallow decode of the first
//! document answers "is this a v1beta1 CRD, and for which group, kind and
//! versions"; anything that fails here is skipped, since manifest
//! directories usually hold other YAML too. Files that pass are then parsed
//! losslessly, and a failure at that point is an error.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

use schemapatch_yaml::Node;

use crate::error::{PatchError, Result};
use crate::gvk::GroupKind;
use crate::schema::JsonSchemaProps;

/// `apiVersion` of the CRDs the patcher understands
pub const CRD_API_VERSION: &str = "apiextensions.k8s.io/v1beta1";

/// `kind` of the CRDs the patcher understands
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// A CRD manifest being patched
#[derive(Debug, Clone)]
pub struct PartialCrd {
    pub group_kind: GroupKind,
    /// Lossless tree of the file, edited in place
    pub document: Node,
    /// Declared version names, in declaration order
    pub versions: IndexSet<String>,
    /// Base name of the file
    pub file_name: String,
    /// File contents as read
    pub original: String,
    /// New schema per version; versions missing here get their schema cleared
    pub new_schemata: BTreeMap<String, JsonSchemaProps>,
}

impl PartialCrd {
    /// Parse `content` into a partial CRD, `Ok(None)` when it is not a CRD
    pub fn from_content(path: &Path, content: String) -> Result<Option<Self>> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some((group_kind, versions)) = identify(&file_name, &content) else {
            return Ok(None);
        };

        let document =
            schemapatch_yaml::parse(&content).map_err(|source| PatchError::MalformedDocument {
                file: file_name.clone(),
                source,
            })?;

        Ok(Some(Self {
            group_kind,
            document,
            versions,
            file_name,
            original: content,
            new_schemata: BTreeMap::new(),
        }))
    }

    /// Whether `version` is declared by this CRD
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.contains(version)
    }
}

/// Loaded CRDs keyed by group and kind, in file name order
#[derive(Debug, Clone, Default)]
pub struct CrdSet {
    crds: IndexMap<GroupKind, PartialCrd>,
}

impl CrdSet {
    /// Add a CRD; a second file for the same group and kind is an error
    pub fn insert(&mut self, crd: PartialCrd) -> Result<()> {
        if let Some(existing) = self.crds.get(&crd.group_kind) {
            return Err(PatchError::DuplicateCrd {
                group_kind: crd.group_kind.clone(),
                first: existing.file_name.clone(),
                second: crd.file_name,
            });
        }
        self.crds.insert(crd.group_kind.clone(), crd);
        Ok(())
    }

    pub fn get(&self, group_kind: &GroupKind) -> Option<&PartialCrd> {
        self.crds.get(group_kind)
    }

    pub fn get_mut(&mut self, group_kind: &GroupKind) -> Option<&mut PartialCrd> {
        self.crds.get_mut(group_kind)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PartialCrd> {
        self.crds.values_mut()
    }

    pub fn len(&self) -> usize {
        self.crds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crds.is_empty()
    }
}

/// Load every CRD found directly inside `dir`
pub fn load_directory(dir: &Path) -> Result<CrdSet> {
    let metadata = std::fs::metadata(dir).map_err(|e| PatchError::io(dir, e))?;
    if !metadata.is_dir() {
        return Err(PatchError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let mut set = CrdSet::default();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            PatchError::io(path, e.into())
        })?;
        let path = entry.path();
        let is_yaml = path.extension().and_then(|ext| ext.to_str()) == Some("yaml");
        if entry.file_type().is_dir() || !is_yaml {
            continue;
        }

        let bytes = std::fs::read(path).map_err(|e| PatchError::io(path, e))?;
        let Ok(content) = String::from_utf8(bytes) else {
            tracing::debug!(file = %path.display(), "skipping file that is not UTF-8");
            continue;
        };

        if let Some(crd) = PartialCrd::from_content(path, content)? {
            tracing::debug!(
                file = %crd.file_name,
                crd = %crd.group_kind,
                versions = ?crd.versions,
                "found CRD"
            );
            set.insert(crd)?;
        }
    }
    Ok(set)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct CrdShape {
    #[serde(default)]
    spec: CrdSpecShape,
}

#[derive(Debug, Default, Deserialize)]
struct CrdSpecShape {
    #[serde(default)]
    group: String,
    #[serde(default)]
    names: NamesShape,
    #[serde(default)]
    version: String,
    #[serde(default)]
    versions: Vec<VersionShape>,
}

#[derive(Debug, Default, Deserialize)]
struct NamesShape {
    #[serde(default)]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct VersionShape {
    #[serde(default)]
    name: String,
}

/// Decode the first document of `content` as `T`
fn shallow_decode<T: DeserializeOwned>(
    content: &str,
) -> Option<std::result::Result<T, serde_yaml::Error>> {
    serde_yaml::Deserializer::from_str(content)
        .next()
        .map(|document| T::deserialize(document))
}

/// Group, kind and declared versions of a v1beta1 CRD manifest
fn identify(file_name: &str, content: &str) -> Option<(GroupKind, IndexSet<String>)> {
    let type_meta: TypeMeta = match shallow_decode(content)? {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(file = file_name, error = %e, "skipping undecodable file");
            return None;
        }
    };
    if type_meta.api_version != CRD_API_VERSION || type_meta.kind != CRD_KIND {
        tracing::debug!(
            file = file_name,
            api_version = %type_meta.api_version,
            kind = %type_meta.kind,
            "skipping non-CRD file"
        );
        return None;
    }

    let crd: CrdShape = match shallow_decode(content)? {
        Ok(crd) => crd,
        Err(e) => {
            tracing::debug!(file = file_name, error = %e, "skipping CRD with unexpected shape");
            return None;
        }
    };
    let spec = crd.spec;
    let versions: IndexSet<String> = if spec.versions.is_empty() {
        std::iter::once(spec.version).filter(|v| !v.is_empty()).collect()
    } else {
        spec.versions.into_iter().map(|v| v.name).collect()
    };
    Some((GroupKind::new(spec.group, spec.names.kind), versions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WIDGET: &str = concat!(
        "apiVersion: apiextensions.k8s.io/v1beta1\nkind: CustomResourceDefinition\n",
        "spec:\n  group: example.io\n  names: {kind: Widget}\n",
        "  versions:\n  - name: v1\n  - name: v2\n",
    );

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_identify() {
        let (gk, versions) = identify("w.yaml", WIDGET).unwrap();
        assert_eq!(gk, GroupKind::new("example.io", "Widget"));
        assert_eq!(versions.iter().collect::<Vec<_>>(), vec!["v1", "v2"]);
    }

    #[test]
    fn test_identify_legacy_version() {
        let legacy = concat!(
            "apiVersion: apiextensions.k8s.io/v1beta1\nkind: CustomResourceDefinition\n",
            "spec:\n  group: example.io\n  names:\n    kind: Gadget\n  version: v1alpha1\n",
        );
        let (_, versions) = identify("g.yaml", legacy).unwrap();
        assert_eq!(versions.iter().collect::<Vec<_>>(), vec!["v1alpha1"]);
    }

    #[test]
    fn test_identify_rejects_other_documents() {
        assert!(identify("a.yaml", "apiVersion: v1\nkind: ConfigMap\n").is_none());
        let no_spec = "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\n";
        assert!(identify("b.yaml", no_spec).is_none());
        assert!(identify("c.yaml", "- just\n- a list\n").is_none());
        assert!(identify("d.yaml", "").is_none());
        assert!(identify("e.yaml", "{{ template }}").is_none());
    }

    #[test]
    fn test_load_directory_filters_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "widget.yaml", WIDGET);
        write(&dir, "widget.yml", WIDGET);
        write(&dir, "widget.json", WIDGET);
        write(&dir, "configmap.yaml", "apiVersion: v1\nkind: ConfigMap\n");
        write(&dir, "broken.yaml", "apiVersion: [\n");
        std::fs::write(dir.path().join("binary.yaml"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::create_dir(dir.path().join("nested.yaml")).unwrap();

        let set = load_directory(dir.path()).unwrap();
        assert_eq!(set.len(), 1);
        let crd = set.get(&GroupKind::new("example.io", "Widget")).unwrap();
        assert_eq!(crd.file_name, "widget.yaml");
        assert_eq!(crd.original, WIDGET);
        assert!(crd.has_version("v2"));
        assert!(crd.new_schemata.is_empty());
    }

    #[test]
    fn test_duplicate_group_kind_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", WIDGET);
        write(&dir, "b.yaml", WIDGET);
        let err = load_directory(dir.path()).unwrap_err();
        assert!(
            matches!(
                &err,
                PatchError::DuplicateCrd { first, second, .. }
                    if first == "a.yaml" && second == "b.yaml"
            ),
            "{err}"
        );
    }

    #[test]
    fn test_lossless_parse_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        // decodes fine for serde_yaml but uses an explicit key
        let content = format!("{}? extra\n: value\n", WIDGET);
        write(&dir, "odd.yaml", &content);
        let err = load_directory(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            PatchError::MalformedDocument { ref file, .. } if file == "odd.yaml"
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_directory(&dir.path().join("missing")),
            Err(PatchError::Io { .. })
        ));
    }
}

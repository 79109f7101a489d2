//! Patching CRD manifests with new schemata
//!
//! The [`Generator`] runs a straight pipeline: load every CRD of the
//! manifests directory, register the supplied schemata against them, edit
//! each document that received at least one schema, then write them out.
//!
//! A CRD whose declared versions all received the same schema gets it once,
//! at `spec.validation.openAPIV3Schema`, and no per-version schemata.
//! Otherwise `spec.validation` goes away and every entry of `spec.versions`
//! gets its own schema, or loses it when none was supplied.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use schemapatch_yaml::{EmitOptions, Node, NodeKind, YamlError, delete, emit, get, get_mut, set};

use crate::cancel::{CancellationCheck, CancellationToken};
use crate::description::truncate_descriptions;
use crate::error::{PatchError, Result};
use crate::gvk::{GroupKind, TypeIdent};
use crate::loader::{CrdSet, PartialCrd, load_directory};
use crate::output::OutputRule;
use crate::render::render_schema;
use crate::schema::JsonSchemaProps;
use crate::source::SchemaSource;

/// Indentation of emitted manifests
pub const INDENT: usize = 2;

const VALIDATION_SCHEMA_PATH: &[&str] = &["spec", "validation", "openAPIV3Schema"];
const VERSIONS_PATH: &[&str] = &["spec", "versions"];

/// Where the schemata of a CRD end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// One schema at `spec.validation.openAPIV3Schema`
    Global,
    /// One schema per entry of `spec.versions`
    PerVersion,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::PerVersion => write!(f, "per-version"),
        }
    }
}

/// A CRD after patching
#[derive(Debug, Clone)]
pub struct PatchedCrd {
    pub group_kind: GroupKind,
    pub file_name: String,
    pub placement: Placement,
    /// Versions that received a schema
    pub patched_versions: Vec<String>,
    pub original: String,
    pub output: String,
}

impl PatchedCrd {
    /// Whether the output differs from the file as read
    pub fn is_changed(&self) -> bool {
        self.original != self.output
    }
}

/// Patches CRD manifests with supplied schemata
#[derive(Debug, Clone, Default)]
pub struct Generator {
    max_desc_len: Option<usize>,
    cancel: CancellationToken,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit description lengths; `Some(0)` drops descriptions
    pub fn with_max_desc_len(mut self, max_desc_len: Option<usize>) -> Self {
        self.max_desc_len = max_desc_len;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Load, patch and write every CRD of `manifests`
    pub fn generate(
        &self,
        manifests: &Path,
        source: &dyn SchemaSource,
        output: &dyn OutputRule,
    ) -> Result<Vec<PatchedCrd>> {
        let patched = self.plan(manifests, source)?;
        self.write(&patched, output)?;
        Ok(patched)
    }

    /// Load and patch every CRD of `manifests` without writing anything
    pub fn plan(&self, manifests: &Path, source: &dyn SchemaSource) -> Result<Vec<PatchedCrd>> {
        let mut crds = load_directory(manifests)?;
        if crds.is_empty() {
            tracing::warn!(manifests = %manifests.display(), "no CRD manifests found");
        }
        let registered = self.register(&mut crds, source);
        tracing::info!(crds = crds.len(), registered, "registered schemata");
        self.patch(&mut crds)
    }

    /// Record the schemata of `source` against the CRDs they belong to.
    /// Returns how many schemata were recorded.
    pub fn register(&self, crds: &mut CrdSet, source: &dyn SchemaSource) -> usize {
        let mut registered = 0;
        for (ident, schema) in source.schemata() {
            let Some(gv) = source.group_version(&ident.package) else {
                tracing::debug!(schema = %ident, "skipping schema without a group version");
                continue;
            };
            let group_kind = GroupKind::new(gv.group, ident.name.as_str());
            let Some(crd) = crds.get_mut(&group_kind) else {
                tracing::debug!(schema = %ident, crd = %group_kind, "no manifest for schema");
                continue;
            };
            if !crd.has_version(&gv.version) {
                tracing::debug!(
                    schema = %ident,
                    version = %gv.version,
                    file = %crd.file_name,
                    "skipping schema for undeclared version"
                );
                continue;
            }
            crd.new_schemata.insert(gv.version, self.prepare(&ident, schema));
            registered += 1;
        }
        registered
    }

    fn prepare(&self, ident: &TypeIdent, schema: &JsonSchemaProps) -> JsonSchemaProps {
        let mut schema = schema.clone();
        if let Some(max_len) = self.max_desc_len {
            tracing::debug!(schema = %ident, max_len, "truncating descriptions");
            truncate_descriptions(&mut schema, max_len);
        }
        schema
    }

    /// Edit every CRD that received schemata and emit it. CRDs without new
    /// schemata are left out.
    pub fn patch(&self, crds: &mut CrdSet) -> Result<Vec<PatchedCrd>> {
        let mut patched = Vec::new();
        for crd in crds.iter_mut() {
            self.cancel.check()?;
            if crd.new_schemata.is_empty() {
                tracing::debug!(
                    file = %crd.file_name,
                    crd = %crd.group_kind,
                    "no new schemata, leaving untouched"
                );
                continue;
            }

            let placement = placement_for(crd);
            tracing::debug!(
                file = %crd.file_name,
                crd = %crd.group_kind,
                %placement,
                "placing schemata"
            );
            apply_placement(crd, placement)?;

            let options = EmitOptions {
                indent: INDENT,
                ..EmitOptions::default()
            };
            let output =
                emit(&crd.document, &options).map_err(|source| PatchError::MalformedDocument {
                    file: crd.file_name.clone(),
                    source,
                })?;
            patched.push(PatchedCrd {
                group_kind: crd.group_kind.clone(),
                file_name: crd.file_name.clone(),
                placement,
                patched_versions: crd.new_schemata.keys().cloned().collect(),
                original: crd.original.clone(),
                output,
            });
        }
        Ok(patched)
    }

    /// Write patched CRDs through `output`
    pub fn write(&self, patched: &[PatchedCrd], output: &dyn OutputRule) -> Result<()> {
        for crd in patched {
            self.cancel.check()?;
            let to_output_error = |source| PatchError::Output {
                file: crd.file_name.clone(),
                source,
            };
            let mut writer = output.open(&crd.file_name).map_err(to_output_error)?;
            writer.write_all(crd.output.as_bytes()).map_err(to_output_error)?;
            writer.close().map_err(to_output_error)?;
            tracing::info!(
                file = %crd.file_name,
                crd = %crd.group_kind,
                placement = %crd.placement,
                "wrote CRD"
            );
        }
        Ok(())
    }
}

/// Global placement iff every declared version received a schema and all of
/// them are equal
pub fn placement_for(crd: &PartialCrd) -> Placement {
    let mut schemata = crd.versions.iter().map(|version| crd.new_schemata.get(version));
    let Some(Some(first)) = schemata.next() else {
        return Placement::PerVersion;
    };
    if schemata.all(|schema| schema == Some(first)) {
        Placement::Global
    } else {
        Placement::PerVersion
    }
}

/// Edit the document of `crd` for `placement`
pub fn apply_placement(crd: &mut PartialCrd, placement: Placement) -> Result<()> {
    let PartialCrd {
        group_kind,
        document,
        versions,
        file_name,
        new_schemata,
        ..
    } = crd;
    let ctx = Ctx {
        file: file_name,
        group_kind,
    };
    match placement {
        Placement::Global => {
            let schema = versions
                .iter()
                .find_map(|version| new_schemata.get(version).map(|schema| (version, schema)));
            let Some((version, schema)) = schema else {
                let at = VALIDATION_SCHEMA_PATH.join(".");
                return Err(ctx.malformed(at, "no schema to place globally"));
            };
            set_global_schema(&ctx, document, version, schema)
        }
        Placement::PerVersion => set_versioned_schemata(&ctx, document, new_schemata),
    }
}

struct Ctx<'a> {
    file: &'a str,
    group_kind: &'a GroupKind,
}

impl Ctx<'_> {
    fn malformed(&self, path: impl Into<String>, message: impl Into<String>) -> PatchError {
        PatchError::malformed_crd(self.file, path, message)
    }

    fn yaml(&self, path: &[&str], err: YamlError) -> PatchError {
        self.malformed(path.join("."), err.to_string())
    }

    fn render(&self, version: &str, schema: &JsonSchemaProps) -> Result<Node> {
        render_schema(schema).map_err(|e| PatchError::SchemaRender {
            group_kind: self.group_kind.clone(),
            version: version.to_string(),
            message: e.to_string(),
        })
    }
}

fn set_global_schema(
    ctx: &Ctx<'_>,
    document: &mut Node,
    version: &str,
    schema: &JsonSchemaProps,
) -> Result<()> {
    let node = ctx.render(version, schema)?;
    set(document, node, VALIDATION_SCHEMA_PATH).map_err(|e| ctx.yaml(VALIDATION_SCHEMA_PATH, e))?;

    let Some(versions) = versions_node(ctx, document)? else {
        return Ok(());
    };
    for (i, item) in versions.children.iter_mut().enumerate() {
        delete(item, &["schema"])
            .map_err(|e| ctx.malformed(format!("spec.versions[{}]", i), e.to_string()))?;
    }
    Ok(())
}

fn set_versioned_schemata(
    ctx: &Ctx<'_>,
    document: &mut Node,
    new_schemata: &BTreeMap<String, JsonSchemaProps>,
) -> Result<()> {
    delete(document, &["spec", "validation"]).map_err(|e| ctx.yaml(&["spec", "validation"], e))?;

    let Some(versions) = versions_node(ctx, document)? else {
        return Err(ctx.malformed(VERSIONS_PATH.join("."), "unexpected missing versions"));
    };
    for (i, item) in versions.children.iter_mut().enumerate() {
        let at = format!("spec.versions[{}]", i);
        let name = match get(item, &["name"]) {
            Ok(Some(name)) if name.kind == NodeKind::Scalar && name.short_tag() == "!!str" => {
                name.value.clone()
            }
            _ => return Err(ctx.malformed(at, "version name was not a string")),
        };
        if name.is_empty() {
            return Err(ctx.malformed(at, "unexpected empty version name"));
        }

        match new_schemata.get(&name) {
            Some(schema) => {
                let node = ctx.render(&name, schema)?;
                set(item, node, &["schema", "openAPIV3Schema"])
                    .map_err(|e| ctx.malformed(at.as_str(), e.to_string()))?;
            }
            None => {
                tracing::debug!(
                    file = ctx.file,
                    version = %name,
                    "clearing schema of version without a new one"
                );
                delete(item, &["schema"]).map_err(|e| ctx.malformed(at.as_str(), e.to_string()))?;
            }
        }
    }
    Ok(())
}

/// `spec.versions`, which must be a sequence when present
fn versions_node<'d>(ctx: &Ctx<'_>, document: &'d mut Node) -> Result<Option<&'d mut Node>> {
    match get_mut(document, VERSIONS_PATH).map_err(|e| ctx.yaml(VERSIONS_PATH, e))? {
        Some(node) if node.kind != NodeKind::Sequence => {
            Err(ctx.malformed(VERSIONS_PATH.join("."), "unexpected non-sequence versions"))
        }
        found => Ok(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvk::GroupVersion;
    use crate::output::MemoryOutput;
    use crate::source::SchemaBundle;
    use std::path::Path;

    const PKG_V1: &str = "example.io/api/v1";
    const PKG_V2: &str = "example.io/api/v2";

    fn crd(versions_block: &str) -> PartialCrd {
        let content = format!(
            concat!(
                "# Widgets\napiVersion: apiextensions.k8s.io/v1beta1\n",
                "kind: CustomResourceDefinition\nmetadata:\n  name: widgets.example.io\n",
                "spec:\n  group: example.io\n  names: {{kind: Widget}}\n{}",
            ),
            versions_block
        );
        PartialCrd::from_content(Path::new("widget.yaml"), content).unwrap().unwrap()
    }

    fn set_of(crd: PartialCrd) -> CrdSet {
        let mut set = CrdSet::default();
        set.insert(crd).unwrap();
        set
    }

    fn bundle() -> SchemaBundle {
        SchemaBundle::default()
            .with_group_version(PKG_V1, GroupVersion::new("example.io", "v1"))
            .with_group_version(PKG_V2, GroupVersion::new("example.io", "v2"))
    }

    fn size_schema(type_: &str) -> JsonSchemaProps {
        JsonSchemaProps::typed("object").with_property("size", JsonSchemaProps::typed(type_))
    }

    fn run(crds: &mut CrdSet, source: &SchemaBundle) -> Vec<PatchedCrd> {
        let generator = Generator::new();
        generator.register(crds, source);
        generator.patch(crds).unwrap()
    }

    fn reparse(output: &str) -> Node {
        schemapatch_yaml::parse(output).unwrap()
    }

    fn schema_at(doc: &Node, path: &[&str]) -> Option<JsonSchemaProps> {
        get(doc, path)
            .unwrap()
            .map(|node| serde_yaml::from_value(node.to_yaml_value().unwrap()).unwrap())
    }

    fn version_names(doc: &Node) -> Vec<String> {
        get(doc, VERSIONS_PATH)
            .unwrap()
            .map(|seq| {
                seq.children
                    .iter()
                    .map(|item| item.get("name").unwrap().value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_single_version_lifts_to_global() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n      served: true # keep me\n"));
        let source = bundle().with_schema(PKG_V1, "Widget", size_schema("integer"));
        let patched = run(&mut crds, &source);

        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].placement, Placement::Global);
        let expected = format!(
            concat!(
                "{}  validation:\n    openAPIV3Schema:\n      type: object\n",
                "      properties:\n        size:\n          type: integer\n",
            ),
            patched[0].original
        );
        // the new key lands after `versions`, at the end of `spec`
        assert_eq!(patched[0].output, expected);
    }

    #[test]
    fn test_distinct_schemata_go_per_version() {
        let mut crds = set_of(crd(concat!(
            "  validation:\n    openAPIV3Schema: {type: object}\n",
            "  versions:\n    - name: v1\n      served: true\n    - name: v2\n      served: true\n",
        )));
        let source = bundle()
            .with_schema(PKG_V1, "Widget", size_schema("integer"))
            .with_schema(PKG_V2, "Widget", size_schema("string"));
        let patched = run(&mut crds, &source);
        assert_eq!(patched[0].placement, Placement::PerVersion);

        let doc = reparse(&patched[0].output);
        assert!(get(&doc, &["spec", "validation"]).unwrap().is_none());
        let versions = get(&doc, VERSIONS_PATH).unwrap().unwrap();
        let schema_of = |i: usize| schema_at(&versions.children[i], &["schema", "openAPIV3Schema"]);
        assert_eq!(schema_of(0), Some(size_schema("integer")));
        assert_eq!(schema_of(1), Some(size_schema("string")));
    }

    #[test]
    fn test_partial_supply_clears_other_versions() {
        let mut crds = set_of(crd(concat!(
            "  versions:\n    - name: v1\n      schema:\n        openAPIV3Schema: {type: string}\n",
            "    - name: v2\n      schema:\n        openAPIV3Schema: {type: string}\n",
        )));
        let source = bundle().with_schema(PKG_V1, "Widget", size_schema("integer"));
        let patched = run(&mut crds, &source);
        assert_eq!(patched[0].placement, Placement::PerVersion);

        let doc = reparse(&patched[0].output);
        let versions = get(&doc, VERSIONS_PATH).unwrap().unwrap();
        assert_eq!(
            schema_at(&versions.children[0], &["schema", "openAPIV3Schema"]),
            Some(size_schema("integer"))
        );
        assert!(get(&versions.children[1], &["schema"]).unwrap().is_none());
        assert!(get(&doc, &["spec", "validation"]).unwrap().is_none());
    }

    #[test]
    fn test_equal_schemata_lift_and_drop_per_version() {
        let mut crds = set_of(crd(concat!(
            "  versions:\n    - name: v1\n      schema:\n        openAPIV3Schema: {type: string}\n",
            "    - name: v2\n",
        )));
        let source = bundle()
            .with_schema(PKG_V1, "Widget", size_schema("integer"))
            .with_schema(PKG_V2, "Widget", size_schema("integer"));
        let patched = run(&mut crds, &source);
        assert_eq!(patched[0].placement, Placement::Global);

        let doc = reparse(&patched[0].output);
        assert_eq!(schema_at(&doc, VALIDATION_SCHEMA_PATH), Some(size_schema("integer")));
        let versions = get(&doc, VERSIONS_PATH).unwrap().unwrap();
        assert!(versions.children.iter().all(|v| v.get("schema").is_none()));
        assert_eq!(version_names(&doc), vec!["v1", "v2"]);
    }

    #[test]
    fn test_unmatched_crd_is_not_written() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let source = SchemaBundle::default()
            .with_group_version("other.io/api/v1", GroupVersion::new("other.io", "v1"))
            .with_schema("other.io/api/v1", "Widget", size_schema("integer"));
        let generator = Generator::new();
        assert_eq!(generator.register(&mut crds, &source), 0);
        let patched = generator.patch(&mut crds).unwrap();
        assert!(patched.is_empty());

        let output = MemoryOutput::new();
        generator.write(&patched, &output).unwrap();
        assert!(output.file_names().is_empty());
    }

    #[test]
    fn test_undeclared_version_and_unknown_package_are_ignored() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let source = bundle()
            .with_schema(PKG_V2, "Widget", size_schema("integer"))
            .with_schema("unknown/pkg", "Widget", size_schema("integer"));
        assert_eq!(Generator::new().register(&mut crds, &source), 0);
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n    - name: v2\n"));
        let source = bundle()
            .with_schema(PKG_V1, "Widget", size_schema("integer"))
            .with_schema(PKG_V2, "Widget", size_schema("string"));
        let first = run(&mut crds, &source);
        assert!(first[0].is_changed());

        let again = PartialCrd::from_content(Path::new("widget.yaml"), first[0].output.clone())
            .unwrap()
            .unwrap();
        let mut crds = set_of(again);
        let second = run(&mut crds, &source);
        assert!(!second[0].is_changed());
        assert_eq!(second[0].output, first[0].output);
    }

    #[test]
    fn test_legacy_version_field() {
        let mut crds = set_of(crd("  version: v1\n"));
        let source = bundle().with_schema(PKG_V1, "Widget", size_schema("integer"));
        let patched = run(&mut crds, &source);
        assert_eq!(patched[0].placement, Placement::Global);

        let doc = reparse(&patched[0].output);
        assert_eq!(get(&doc, &["spec", "version"]).unwrap().unwrap().value, "v1");
        assert_eq!(schema_at(&doc, VALIDATION_SCHEMA_PATH), Some(size_schema("integer")));
    }

    #[test]
    fn test_truncates_descriptions() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let schema = size_schema("integer").with_description("First. Second.");
        let source = bundle().with_schema(PKG_V1, "Widget", schema);
        let generator = Generator::new().with_max_desc_len(Some(8));
        generator.register(&mut crds, &source);
        let patched = generator.patch(&mut crds).unwrap();

        let doc = reparse(&patched[0].output);
        let placed = schema_at(&doc, VALIDATION_SCHEMA_PATH).unwrap();
        assert_eq!(placed.description, "First.");
    }

    #[test]
    fn test_non_string_version_name_is_malformed() {
        let mut crd = crd("  versions:\n    - name: v1\n    - name: v2\n");
        crd.new_schemata.insert("v2".to_string(), size_schema("integer"));
        let versions = get_mut(&mut crd.document, VERSIONS_PATH).unwrap().unwrap();
        set(&mut versions.children[0], Node::null(), &["name"]).unwrap();
        let err = apply_placement(&mut crd, Placement::PerVersion).unwrap_err();
        assert!(
            matches!(&err, PatchError::MalformedCrd { path, .. } if path == "spec.versions[0]"),
            "{err}"
        );
    }

    #[test]
    fn test_non_sequence_versions_is_malformed() {
        let mut crd = crd("  versions:\n    - name: v1\n");
        crd.new_schemata.insert("v1".to_string(), size_schema("integer"));
        set(&mut crd.document, Node::string("oops"), VERSIONS_PATH).unwrap();
        assert!(matches!(
            apply_placement(&mut crd, Placement::Global),
            Err(PatchError::MalformedCrd { .. })
        ));
    }

    #[test]
    fn test_cancelled_generator_stops() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let source = bundle().with_schema(PKG_V1, "Widget", size_schema("integer"));
        let token = CancellationToken::new();
        let generator = Generator::new().with_cancellation(token.clone());
        generator.register(&mut crds, &source);
        token.cancel();
        assert!(matches!(generator.patch(&mut crds), Err(PatchError::Cancelled)));
    }

    #[test]
    fn test_forty_byte_limit_cuts_long_description_at_sentence_end() {
        let mut description: String =
            (0..7).map(|i| format!("Sentence {} explains a part. ", i)).collect();
        description.push_str("Done");
        assert_eq!(description.len(), 200);

        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let schema = size_schema("integer").with_description(description);
        let source = bundle().with_schema(PKG_V1, "Widget", schema);
        let generator = Generator::new().with_max_desc_len(Some(40));
        generator.register(&mut crds, &source);
        let patched = generator.patch(&mut crds).unwrap();

        let placed = schema_at(&reparse(&patched[0].output), VALIDATION_SCHEMA_PATH).unwrap();
        assert!(placed.description.len() <= 40);
        assert_eq!(placed.description, "Sentence 0 explains a part.");
    }

    #[test]
    fn test_generate_runs_the_whole_pipeline() {
        let dir = tempfile::TempDir::new().unwrap();
        let widget = concat!(
            "apiVersion: apiextensions.k8s.io/v1beta1\nkind: CustomResourceDefinition\n",
            "spec:\n  group: example.io\n  names:\n    kind: Widget\n",
            "  versions:\n  - name: v1\n  - name: v2\n",
        );
        let configmap = "apiVersion: v1\nkind: ConfigMap\n";
        std::fs::write(dir.path().join("widget.yaml"), widget).unwrap();
        std::fs::write(dir.path().join("configmap.yaml"), configmap).unwrap();

        let source = bundle()
            .with_schema(PKG_V1, "Widget", size_schema("integer"))
            .with_schema(PKG_V2, "Widget", size_schema("string"));
        let output = MemoryOutput::new();
        let patched = Generator::new().generate(dir.path(), &source, &output).unwrap();

        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].placement, Placement::PerVersion);
        assert_eq!(patched[0].patched_versions, vec!["v1", "v2"]);
        assert_eq!(output.file_names(), vec!["widget.yaml"]);
        assert_eq!(output.get("widget.yaml"), Some(patched[0].output.clone()));
        // files on disk only change through the output rule
        assert_eq!(std::fs::read_to_string(dir.path().join("widget.yaml")).unwrap(), widget);
    }

    #[test]
    fn test_cancellation_between_writes() {
        let mut crds = set_of(crd("  versions:\n    - name: v1\n"));
        let source = bundle().with_schema(PKG_V1, "Widget", size_schema("integer"));
        let token = CancellationToken::new();
        let generator = Generator::new().with_cancellation(token.clone());
        generator.register(&mut crds, &source);
        let patched = generator.patch(&mut crds).unwrap();

        token.cancel();
        let output = MemoryOutput::new();
        assert!(matches!(generator.write(&patched, &output), Err(PatchError::Cancelled)));
        assert!(output.file_names().is_empty());
    }
}

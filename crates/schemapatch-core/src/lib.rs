//! Schemapatch Core - patch CRD manifests with generated schemata
//!
//! This crate edits existing `apiextensions.k8s.io/v1beta1`
//! CustomResourceDefinition manifests in place:
//! - `loader`: finds the CRDs of a manifests directory
//! - `source`: supplies schemata and the group version of each package
//! - `patcher`: decides global or per-version placement and edits the documents
//! - `output`: writes the results to a directory, stdout or memory
//!
//! Everything outside the schema fields, comments included, is kept as it was.

pub mod cancel;
pub mod config;
pub mod description;
pub mod error;
pub mod gvk;
pub mod loader;
pub mod output;
pub mod patcher;
pub mod render;
pub mod schema;
pub mod source;

pub use cancel::{CancellationCheck, CancellationToken};
pub use config::{CONFIG_FILE_NAME, Config};
pub use description::truncate_descriptions;
pub use error::{PatchError, Result};
pub use gvk::{GroupKind, GroupVersion, TypeIdent};
pub use loader::{CRD_API_VERSION, CRD_KIND, CrdSet, PartialCrd, load_directory};
pub use output::{DirectoryOutput, MemoryOutput, OutputRule, OutputWriter, StdoutOutput};
pub use patcher::{Generator, PatchedCrd, Placement};
pub use render::render_schema;
pub use schema::{
    ExternalDocumentation, JsonSchemaProps, JsonSchemaPropsOrArray, JsonSchemaPropsOrBool,
    JsonSchemaPropsOrStringArray,
};
pub use source::{BundleEntry, SchemaBundle, SchemaSource};

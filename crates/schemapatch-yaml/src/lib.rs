//! Lossless YAML document model
//!
//! This crate parses a YAML document into a [`Node`] tree that keeps
//! comments, key order, anchors and quoting, lets callers edit the tree
//! through a few path operators, and emits it again. Parts of the tree that
//! were not touched come out byte for byte as they went in, so a diff
//! between input and output only shows the edits.
//!
//! ```
//! use schemapatch_yaml::{emit, parse, set, EmitOptions, Node};
//!
//! let mut doc = parse("# widget\nspec:\n  group: example.io\n").unwrap();
//! set(&mut doc, Node::string("Widget"), &["spec", "names", "kind"]).unwrap();
//! let out = emit(&doc, &EmitOptions::default()).unwrap();
//! assert_eq!(out, "# widget\nspec:\n  group: example.io\n  names:\n    kind: Widget\n");
//! ```

pub mod emitter;
pub mod error;
pub mod node;
pub mod parser;
pub mod path;
pub mod resolve;
pub mod value;

pub use emitter::{EmitOptions, emit};
pub use error::{Result, YamlError};
pub use node::{Node, NodeKind, Style};
pub use parser::parse;
pub use path::{clear_style, delete, get, get_mut, set};

//! Rendering schemata into document trees

use schemapatch_yaml::{Node, clear_style};

use crate::schema::JsonSchemaProps;

/// Render a schema as a mapping node ready to be grafted into a document.
///
/// The node has no style anywhere, so the emitter lays it out the same way
/// it lays out any other new content.
pub fn render_schema(schema: &JsonSchemaProps) -> Result<Node, serde_yaml::Error> {
    let value = serde_yaml::to_value(schema)?;
    let mut node = Node::from_yaml_value(&value);
    clear_style(&mut node);
    Ok(node)
}

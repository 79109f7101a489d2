//! Conversion between [`Node`] trees and `serde_yaml::Value`

use std::collections::HashMap;

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Number, Value};

use crate::error::{Result, YamlError};
use crate::node::{Node, NodeKind, Style};
use crate::resolve::{self, BOOL_TAG, FLOAT_TAG, INT_TAG, NULL_TAG};

/// Largest magnitude below which whole floats are written as integers
const WHOLE_FLOAT_LIMIT: f64 = 1e15;

fn number_node(number: &Number) -> Node {
    if number.is_i64() || number.is_u64() {
        return Node::scalar(number.to_string(), INT_TAG);
    }
    let Some(f) = number.as_f64() else {
        return Node::scalar(number.to_string(), FLOAT_TAG);
    };
    let text = if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf".to_string() } else { "-.inf".to_string() }
    } else if f.fract() == 0.0 && f.abs() < WHOLE_FLOAT_LIMIT {
        return Node::scalar(format!("{}", f as i64), INT_TAG);
    } else if f.fract() == 0.0 {
        format!("{:e}", f)
    } else {
        f.to_string()
    };
    Node::scalar(text, FLOAT_TAG)
}

impl Node {
    /// Build a tree from a `serde_yaml::Value`. Nodes get an empty style, so
    /// the emitter picks their layout.
    pub fn from_yaml_value(value: &Value) -> Node {
        match value {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::scalar(b.to_string(), BOOL_TAG),
            Value::Number(n) => number_node(n),
            Value::String(s) => Node::string(s.as_str()),
            Value::Sequence(items) => {
                let mut node = Node::sequence();
                node.children = items.iter().map(Node::from_yaml_value).collect();
                node
            }
            Value::Mapping(map) => {
                let mut node = Node::mapping();
                for (key, value) in map {
                    node.push_pair(Node::from_yaml_value(key), Node::from_yaml_value(value));
                }
                node
            }
            Value::Tagged(tagged) => {
                let mut node = Node::from_yaml_value(&tagged.value);
                node.tag = tagged.tag.to_string();
                node.style.insert(Style::TAGGED);
                node
            }
        }
    }

    /// Convert the tree into a `serde_yaml::Value`, resolving aliases
    pub fn to_yaml_value(&self) -> Result<Value> {
        let mut anchors = HashMap::new();
        self.value_with(&mut anchors)
    }

    fn value_with(&self, anchors: &mut HashMap<String, Value>) -> Result<Value> {
        let value = match self.kind {
            NodeKind::Document => match self.children.first() {
                Some(root) => root.value_with(anchors)?,
                None => Value::Null,
            },
            NodeKind::Alias => anchors
                .get(&self.value)
                .cloned()
                .ok_or_else(|| YamlError::Conversion(format!("unknown anchor '{}'", self.value)))?,
            NodeKind::Scalar => self.scalar_value()?,
            NodeKind::Sequence => Value::Sequence(
                self.children
                    .iter()
                    .map(|child| child.value_with(anchors))
                    .collect::<Result<_>>()?,
            ),
            NodeKind::Mapping => {
                if self.children.len() % 2 != 0 {
                    return Err(YamlError::Conversion(
                        "mapping has an odd number of children".to_string(),
                    ));
                }
                let mut map = Mapping::new();
                for pair in self.children.chunks_exact(2) {
                    let key = pair[0].value_with(anchors)?;
                    let value = pair[1].value_with(anchors)?;
                    map.insert(key, value);
                }
                Value::Mapping(map)
            }
        };
        if !self.anchor.is_empty() {
            anchors.insert(self.anchor.clone(), value.clone());
        }
        Ok(value)
    }

    fn scalar_value(&self) -> Result<Value> {
        let tag = self.short_tag();
        let invalid =
            || YamlError::Conversion(format!("'{}' is not a valid {} value", self.value, tag));
        Ok(match tag.as_str() {
            NULL_TAG => Value::Null,
            BOOL_TAG => match self.value.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            INT_TAG => {
                let n = resolve::parse_int(&self.value).ok_or_else(invalid)?;
                if let Ok(n) = i64::try_from(n) {
                    Value::Number(n.into())
                } else {
                    Value::Number(u64::try_from(n).map_err(|_| invalid())?.into())
                }
            }
            FLOAT_TAG => {
                Value::Number(resolve::parse_float(&self.value).ok_or_else(invalid)?.into())
            }
            custom if custom.starts_with('!') && !custom.starts_with("!!") && custom.len() > 1 => {
                Value::Tagged(Box::new(TaggedValue {
                    tag: Tag::new(custom),
                    value: Value::String(self.value.clone()),
                }))
            }
            _ => Value::String(self.value.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_from_value_uses_automatic_style() {
        let value: Value =
            serde_yaml::from_str("type: object\nrequired: [size]\nmaximum: 10.0\nratio: 0.5\n")
                .unwrap();
        let node = Node::from_yaml_value(&value);
        assert!(node.style.is_empty());
        assert_eq!(node.get("maximum").unwrap().value, "10");
        assert_eq!(node.get("maximum").unwrap().tag, INT_TAG);
        assert_eq!(node.get("ratio").unwrap().value, "0.5");
        assert!(node.get("required").unwrap().style.is_empty());
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(number_node(&Number::from(f64::NAN)).value, ".nan");
        assert_eq!(number_node(&Number::from(f64::NEG_INFINITY)).value, "-.inf");
        assert_eq!(number_node(&Number::from(1e20)).value, "1e20");
    }

    #[test]
    fn test_to_value_resolves_aliases() {
        let doc =
            parse("base: &b\n  type: string\ncopy: *b\ncount: 0x10\nflag: True\nquoted: '12'\n")
                .unwrap();
        let value = doc.to_yaml_value().unwrap();
        assert_eq!(value["copy"]["type"], Value::String("string".to_string()));
        assert_eq!(value["count"], Value::Number(16.into()));
        assert_eq!(value["flag"], Value::Bool(true));
        assert_eq!(value["quoted"], Value::String("12".to_string()));
    }

    #[test]
    fn test_unknown_alias_fails() {
        let mut map = Node::mapping();
        map.push_pair(Node::string("a"), Node::alias("missing"));
        assert!(matches!(map.to_yaml_value(), Err(YamlError::Conversion(_))));
    }

    #[test]
    fn test_value_round_trip_through_node() {
        let value: Value =
            serde_yaml::from_str("a: [1, -2, 2.5, ~, 'x', true]\nb: {c: !custom d}\n").unwrap();
        assert_eq!(Node::from_yaml_value(&value).to_yaml_value().unwrap(), value);
    }
}

//! Path operators over mapping keys
//!
//! A path is a list of mapping keys. Every operator accepts either a
//! document (its root is descended) or any node. Keys compare by their
//! scalar value, whatever their quoting.

use crate::error::{Result, YamlError};
use crate::node::{Node, NodeKind, Style};

fn start(node: &Node) -> Option<&Node> {
    if node.kind == NodeKind::Document {
        node.children.first()
    } else {
        Some(node)
    }
}

fn start_mut(node: &mut Node) -> &mut Node {
    if node.kind == NodeKind::Document {
        if node.children.is_empty() {
            node.children.push(Node::mapping());
        }
        &mut node.children[0]
    } else {
        node
    }
}

/// The node at `path`, `None` when a key along the way is missing
pub fn get<'n>(root: &'n Node, path: &[&str]) -> Result<Option<&'n Node>> {
    let Some(mut current) = start(root) else {
        return Ok(None);
    };
    for (depth, key) in path.iter().enumerate() {
        if current.kind != NodeKind::Mapping {
            return Err(YamlError::type_mismatch(&path[..depth], current.kind));
        }
        match current.get(key) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Mutable variant of [`get`]
pub fn get_mut<'n>(root: &'n mut Node, path: &[&str]) -> Result<Option<&'n mut Node>> {
    if root.kind == NodeKind::Document && root.children.is_empty() {
        return Ok(None);
    }
    let mut current = start_mut(root);
    for (depth, key) in path.iter().enumerate() {
        if current.kind != NodeKind::Mapping {
            return Err(YamlError::type_mismatch(&path[..depth], current.kind));
        }
        match current.value_index(key) {
            Some(index) => current = &mut current.children[index],
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Store `value` at `path`, creating missing mappings along the way.
///
/// An existing value is replaced in place, a new pair goes at the end of
/// its mapping. When the existing value already has the same content it is
/// kept as it is, formatting included.
pub fn set(root: &mut Node, value: Node, path: &[&str]) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(YamlError::EmptyPath);
    };
    let mut current = start_mut(root);
    for (depth, key) in parents.iter().enumerate() {
        if current.kind != NodeKind::Mapping {
            return Err(YamlError::type_mismatch(&path[..depth], current.kind));
        }
        let index = match current.value_index(key) {
            Some(index) => index,
            None => {
                current.push_pair(Node::string(*key), Node::mapping());
                current.children.len() - 1
            }
        };
        current = &mut current.children[index];
    }
    if current.kind != NodeKind::Mapping {
        return Err(YamlError::type_mismatch(parents, current.kind));
    }

    match current.value_index(last) {
        Some(index) => {
            let existing = &mut current.children[index];
            if !existing.same_content(&value) {
                *existing = value;
            }
        }
        None => current.push_pair(Node::string(*last), value),
    }
    Ok(())
}

/// Remove the pair at `path`; missing keys make this a no-op
pub fn delete(root: &mut Node, path: &[&str]) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(YamlError::EmptyPath);
    };
    let Some(parent) = get_mut(root, parents)? else {
        return Ok(());
    };
    if parent.kind != NodeKind::Mapping {
        return Err(YamlError::type_mismatch(parents, parent.kind));
    }
    if let Some(index) = parent.value_index(last) {
        parent.children.drain(index - 1..=index);
    }
    Ok(())
}

/// Reset the style of `node` and all of its descendants
pub fn clear_style(node: &mut Node) {
    node.style = Style::empty();
    for child in &mut node.children {
        clear_style(child);
    }
}

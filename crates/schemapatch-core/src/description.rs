//! Description truncation

use crate::schema::JsonSchemaProps;

/// Limit every description in `schema` (nested schemata included) to
/// `max_len` bytes. `0` drops descriptions entirely.
pub fn truncate_descriptions(schema: &mut JsonSchemaProps, max_len: usize) {
    schema.description = truncate(&schema.description, max_len);
    schema.for_each_child_mut(|child| truncate_descriptions(child, max_len));
}

/// Cut `text` to `max_len` bytes, then back to the last sentence end
fn truncate(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let cut = &text[..end];
    match cut.rfind('.') {
        Some(dot) if dot > 0 => cut[..=dot].to_string(),
        _ => cut.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{JsonSchemaPropsOrArray, JsonSchemaPropsOrBool};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short.", 10), "Short.");
        assert_eq!(truncate("First sentence. Second sentence.", 20), "First sentence.");
        assert_eq!(truncate("no sentence end here", 8), "no sente");
        assert_eq!(truncate(".starts with a dot", 5), ".star");
        assert_eq!(truncate("anything", 0), "");
        // never splits a character
        assert_eq!(truncate("héllo", 2), "h");
    }

    #[test]
    fn test_truncate_reaches_nested_schemata() {
        let long = "One. Two. Three.".to_string();
        let mut schema = JsonSchemaProps::typed("object")
            .with_description(long.clone())
            .with_property(
                "size",
                JsonSchemaProps::typed("integer").with_description(long.clone()),
            );
        schema.items = Some(Box::new(JsonSchemaPropsOrArray::Schema(Box::new(
            JsonSchemaProps::default().with_description(long.clone()),
        ))));
        schema.additional_properties = Some(Box::new(JsonSchemaPropsOrBool::Schema(Box::new(
            JsonSchemaProps::default().with_description(long.clone()),
        ))));
        schema.any_of.push(JsonSchemaProps::default().with_description(long));

        truncate_descriptions(&mut schema, 9);
        assert_eq!(schema.description, "One. Two.");
        assert_eq!(schema.properties["size"].description, "One. Two.");
        let Some(JsonSchemaPropsOrArray::Schema(items)) = schema.items.as_deref() else {
            panic!("items changed shape");
        };
        assert_eq!(items.description, "One. Two.");
        let Some(JsonSchemaPropsOrBool::Schema(extra)) = schema.additional_properties.as_deref()
        else {
            panic!("additionalProperties changed shape");
        };
        assert_eq!(extra.description, "One. Two.");
        assert_eq!(schema.any_of[0].description, "One. Two.");
    }

    #[test]
    fn test_zero_drops_descriptions() {
        let mut schema = JsonSchemaProps::typed("object")
            .with_description("Top.")
            .with_property("a", JsonSchemaProps::typed("string").with_description("Nested."));
        truncate_descriptions(&mut schema, 0);
        assert!(schema.description.is_empty());
        assert!(schema.properties["a"].description.is_empty());
    }
}

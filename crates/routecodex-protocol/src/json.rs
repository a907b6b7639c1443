/// The neutral payload tree passed between pipeline stages.
///
/// Everything inside the core operates on this type rather than on a
/// protocol-specific struct; codecs are the only components that convert
/// between it and the typed wire shapes in this crate.
pub type Json = serde_json::Value;

/// A `.`-joined path into a [`Json`] tree, used to report where a
/// conversion failed (e.g. `"choices.0.message.content"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn push(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Reads a field by JSON-pointer-like dotted path, returning `None` on any
/// missing segment rather than erroring — callers decide whether a missing
/// field is fatal.
pub fn get_path<'a>(value: &'a Json, path: &str) -> Option<&'a Json> {
    let mut current = value;
    for segment in path.split('.') {
        if let Ok(index) = segment.parse::<usize>() {
            current = current.as_array()?.get(index)?;
        } else {
            current = current.as_object()?.get(segment)?;
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_array_and_object_segments() {
        let value = json!({"choices": [{"message": {"content": "pong"}}]});
        assert_eq!(
            get_path(&value, "choices.0.message.content"),
            Some(&json!("pong"))
        );
    }

    #[test]
    fn missing_segment_yields_none() {
        let value = json!({"choices": []});
        assert_eq!(get_path(&value, "choices.0.message.content"), None);
    }

    #[test]
    fn field_path_renders_dotted() {
        let path = FieldPath::root().push("choices").push("0").push("message");
        assert_eq!(path.to_string(), "choices.0.message");
    }
}

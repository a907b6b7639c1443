//! Compatibility Shaper (component C6): declarative JSON shape filters plus
//! named hooks that mutate a request/response for a specific provider's
//! quirks. Spec.md §4.7 describes this as config-driven; no teacher module
//! ships the concrete filter engine (`gproxy-transform`, the nearest
//! analog, sits outside this workspace), so the filter operations
//! themselves are modeled on the neutral `Json`/`FieldPath` tools
//! `routecodex-codec` already uses, and provider hooks follow the same
//! `fn(&mut Json)` shape the codec's per-direction functions use.

use routecodex_protocol::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One declarative operation in a shape-filter bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ShapeOp {
    /// Lifts `path.child.*` up to `path.*`, dropping the intermediate
    /// object.
    Flatten { path: String },
    /// Replaces `path` with its own `path.field` value.
    Unwrap { path: String, field: String },
    /// Keeps only the named top-level keys.
    Whitelist { keys: Vec<String> },
    /// Inserts each default where the key is currently absent.
    SupplyDefaults { defaults: Map<String, Value> },
}

/// A named bundle of shape operations for one provider, loaded from a
/// `shapeFilterConfigPath` or a built-in `providerAlias` bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeFilterBundle {
    #[serde(default)]
    pub ops: Vec<ShapeOp>,
}

impl ShapeFilterBundle {
    pub fn apply(&self, value: &mut Json) {
        for op in &self.ops {
            apply_op(op, value);
        }
    }
}

fn apply_op(op: &ShapeOp, value: &mut Json) {
    match op {
        ShapeOp::Flatten { path } => flatten(value, path),
        ShapeOp::Unwrap { path, field } => unwrap(value, path, field),
        ShapeOp::Whitelist { keys } => whitelist(value, keys),
        ShapeOp::SupplyDefaults { defaults } => supply_defaults(value, defaults),
    }
}

fn segment<'a>(value: &'a mut Json, path: &str) -> Option<(&'a mut Map<String, Value>, String)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop()?.to_string();
    let mut current = value.as_object_mut()?;
    for seg in segments {
        current = current.get_mut(seg)?.as_object_mut()?;
    }
    Some((current, last))
}

fn flatten(value: &mut Json, path: &str) {
    let Some((parent, key)) = segment(value, path) else {
        return;
    };
    let Some(Value::Object(child)) = parent.remove(&key) else {
        return;
    };
    for (k, v) in child {
        parent.entry(k).or_insert(v);
    }
}

fn unwrap(value: &mut Json, path: &str, field: &str) {
    let Some((parent, key)) = segment(value, path) else {
        return;
    };
    let Some(Value::Object(mut wrapper)) = parent.get(&key).cloned() else {
        return;
    };
    if let Some(inner) = wrapper.remove(field) {
        parent.insert(key, inner);
    }
}

fn whitelist(value: &mut Json, keys: &[String]) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    obj.retain(|k, _| keys.iter().any(|allowed| allowed == k));
}

fn supply_defaults(value: &mut Json, defaults: &Map<String, Value>) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    for (k, v) in defaults {
        obj.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

/// Narrowing predicates from spec.md §4.7: the shaper is skipped entirely
/// when the current target falls outside either allowed set (an empty set
/// means "no restriction").
pub fn applies_to(provider_match: &[String], protocol_match: &[String], provider_id: &str, provider_protocol: &str) -> bool {
    let provider_ok = provider_match.is_empty() || provider_match.iter().any(|p| p == provider_id);
    let protocol_ok = protocol_match.is_empty() || protocol_match.iter().any(|p| p == provider_protocol);
    provider_ok && protocol_ok
}

/// iFlow-specific request shaping named in spec.md §4.7: strips
/// `function.strict`, and for a function literally named `shell`, rewrites
/// `properties.command` to an array-of-strings schema and requires it.
pub fn iflow_shape_tool_functions(tools: &mut Json) {
    let Some(array) = tools.as_array_mut() else {
        return;
    };
    for tool in array {
        let Some(function) = tool.get_mut("function").and_then(Json::as_object_mut) else {
            continue;
        };
        function.remove("strict");
        if function.get("name").and_then(Json::as_str) != Some("shell") {
            continue;
        }
        let Some(parameters) = function.get_mut("parameters").and_then(Json::as_object_mut) else {
            continue;
        };
        if let Some(properties) = parameters.get_mut("properties").and_then(Json::as_object_mut) {
            properties.insert(
                "command".to_string(),
                serde_json::json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Shell command argv tokens. Use ['bash','-lc','<cmd>'] form.",
                }),
            );
        }
        let required = parameters
            .entry("required")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(required) = required.as_array_mut()
            && !required.iter().any(|v| v.as_str() == Some("command"))
        {
            required.push(Value::String("command".to_string()));
        }
    }
}

/// GLM/iFlow usage-field remap named in spec.md §4.7:
/// `input_tokens→prompt_tokens`, `output_tokens→completion_tokens`, missing
/// totals filled as the sum, `created_at→created`.
pub fn normalize_glm_usage(response: &mut Json) {
    if let Some(usage) = response.get_mut("usage").and_then(Json::as_object_mut) {
        if let Some(input) = usage.remove("input_tokens") {
            usage.entry("prompt_tokens".to_string()).or_insert(input);
        }
        if let Some(output) = usage.remove("output_tokens") {
            usage.entry("completion_tokens".to_string()).or_insert(output);
        }
        if !usage.contains_key("total_tokens") {
            let prompt = usage.get("prompt_tokens").and_then(Json::as_u64).unwrap_or(0);
            let completion = usage.get("completion_tokens").and_then(Json::as_u64).unwrap_or(0);
            usage.insert("total_tokens".to_string(), Value::from(prompt + completion));
        }
    }
    if let Some(obj) = response.as_object_mut()
        && let Some(created_at) = obj.remove("created_at")
    {
        obj.entry("created".to_string()).or_insert(created_at);
    }
}

/// Extracts delimited reasoning spans (`` ```reasoning ... ``` ``,
/// `<thinking>...</thinking>`, `[REASONING]...[/REASONING]`) from `text`,
/// deduped, returning `(remaining_text, reasoning_blocks)`.
pub fn extract_reasoning_blocks(text: &str) -> (String, Vec<String>) {
    let patterns: [(&str, &str); 3] = [
        ("```reasoning", "```"),
        ("<thinking>", "</thinking>"),
        ("[REASONING]", "[/REASONING]"),
    ];
    let mut remaining = text.to_string();
    let mut blocks = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (open, close) in patterns {
        loop {
            let Some(start) = remaining.find(open) else {
                break;
            };
            let search_from = start + open.len();
            let Some(end_rel) = remaining[search_from..].find(close) else {
                break;
            };
            let end = search_from + end_rel;
            let block = remaining[search_from..end].trim().to_string();
            if seen.insert(block.clone()) {
                blocks.push(block);
            }
            remaining.replace_range(start..end + close.len(), "");
        }
    }
    (remaining.trim().to_string(), blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_lifts_child_keys() {
        let mut value = json!({"a": {"x": 1, "y": 2}, "z": 3});
        flatten(&mut value, "a");
        assert_eq!(value, json!({"x": 1, "y": 2, "z": 3}));
    }

    #[test]
    fn whitelist_then_supply_defaults_is_idempotent() {
        let mut value = json!({"keep": 1, "drop": 2});
        let keys = vec!["keep".to_string(), "added".to_string()];
        let mut defaults = Map::new();
        defaults.insert("added".to_string(), json!("default"));

        whitelist(&mut value, &keys);
        supply_defaults(&mut value, &defaults);
        let once = value.clone();

        whitelist(&mut value, &keys);
        supply_defaults(&mut value, &defaults);
        assert_eq!(value, once);
    }

    #[test]
    fn iflow_shell_function_requires_command_array() {
        let mut tools = json!([{
            "type": "function",
            "function": {
                "name": "shell",
                "strict": true,
                "parameters": {"type": "object", "properties": {"command": {"type": "string"}}, "required": []},
            }
        }]);
        iflow_shape_tool_functions(&mut tools);
        let function = &tools[0]["function"];
        assert!(function.get("strict").is_none());
        assert_eq!(function["parameters"]["properties"]["command"]["type"], "array");
        assert_eq!(function["parameters"]["required"][0], "command");
    }

    #[test]
    fn glm_usage_remap_fills_total() {
        let mut response = json!({"usage": {"input_tokens": 3, "output_tokens": 4}, "created_at": 100});
        normalize_glm_usage(&mut response);
        assert_eq!(response["usage"]["prompt_tokens"], 3);
        assert_eq!(response["usage"]["completion_tokens"], 4);
        assert_eq!(response["usage"]["total_tokens"], 7);
        assert_eq!(response["created"], 100);
    }

    #[test]
    fn reasoning_blocks_are_extracted_and_deduped() {
        let text = "before <thinking>same</thinking> middle <thinking>same</thinking> after";
        let (remaining, blocks) = extract_reasoning_blocks(text);
        assert_eq!(blocks, vec!["same".to_string()]);
        assert_eq!(remaining, "before  middle  after");
    }

    #[test]
    fn applies_to_empty_sets_means_unrestricted() {
        assert!(applies_to(&[], &[], "glm", "openai-chat"));
        assert!(!applies_to(&["iflow".to_string()], &[], "glm", "openai-chat"));
    }
}

use serde_json::{Map, Value};

/// Standard JSON Schema keywords (draft-07 plus the common 2019-09/2020-12
/// additions) kept by [`strip_unknown_keywords`].
const KNOWN_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "$ref",
    "$comment",
    "$defs",
    "$anchor",
    "definitions",
    "title",
    "description",
    "default",
    "examples",
    "readOnly",
    "writeOnly",
    "deprecated",
    "type",
    "enum",
    "const",
    "format",
    "contentMediaType",
    "contentEncoding",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "items",
    "prefixItems",
    "additionalItems",
    "unevaluatedItems",
    "contains",
    "maxContains",
    "minContains",
    "maxItems",
    "minItems",
    "uniqueItems",
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "propertyNames",
    "required",
    "maxProperties",
    "minProperties",
    "dependencies",
    "dependentRequired",
    "dependentSchemas",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
];

/// Remove every non-standard keyword from `value` and all of its
/// subschemas. Property names under `properties` and friends are data,
/// not keywords, and are left alone.
pub(crate) fn strip_unknown_keywords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| KNOWN_KEYWORDS.contains(&key.as_str()));
            recurse_subschemas(map);
        }
        Value::Array(items) => {
            for item in items {
                strip_unknown_keywords(item);
            }
        }
        _ => {}
    }
}

fn recurse_subschemas(map: &mut Map<String, Value>) {
    recurse_map_schemas(map, "properties");
    recurse_map_schemas(map, "patternProperties");
    recurse_map_schemas(map, "dependentSchemas");
    recurse_map_schemas(map, "$defs");
    recurse_map_schemas(map, "definitions");

    recurse_single_schema(map, "propertyNames");
    recurse_single_schema(map, "additionalProperties");
    recurse_single_schema(map, "unevaluatedProperties");
    recurse_single_schema(map, "items");
    recurse_single_schema(map, "contains");
    recurse_single_schema(map, "additionalItems");
    recurse_single_schema(map, "unevaluatedItems");
    recurse_single_schema(map, "not");
    recurse_single_schema(map, "if");
    recurse_single_schema(map, "then");
    recurse_single_schema(map, "else");

    recurse_array_schemas(map, "prefixItems");
    recurse_array_schemas(map, "allOf");
    recurse_array_schemas(map, "anyOf");
    recurse_array_schemas(map, "oneOf");

    // draft-07 `dependencies` mixes schemas and required-name arrays.
    if let Some(Value::Object(deps)) = map.get_mut("dependencies") {
        for dep in deps.values_mut() {
            if dep.is_object() {
                strip_unknown_keywords(dep);
            }
        }
    }
}

fn recurse_map_schemas(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Object(obj)) = map.get_mut(key) {
        for value in obj.values_mut() {
            strip_unknown_keywords(value);
        }
    }
}

fn recurse_single_schema(map: &mut Map<String, Value>, key: &str) {
    if let Some(value) = map.get_mut(key) {
        strip_unknown_keywords(value);
    }
}

fn recurse_array_schemas(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Array(items)) = map.get_mut(key) {
        for item in items {
            strip_unknown_keywords(item);
        }
    }
}

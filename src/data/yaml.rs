//! YAML output for reports.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Number, Value};
use yaml_rust_davvid::{Yaml, YamlEmitter};

/// Serializes `data` to YAML, writing multi-line strings such as tag bodies
/// as block literals.
///
/// serde_yaml picks quoting on its own, so the value tree is re-emitted
/// through yaml-rust, whose emitter can write literal blocks.
pub fn to_yaml<T: Serialize>(data: &T) -> Result<String> {
    let value = serde_yaml::to_value(data).context("Failed to convert report to a YAML value")?;
    let node = to_node(&value);

    let mut output = String::new();
    let mut emitter = YamlEmitter::new(&mut output);
    emitter.multiline_strings(true);
    emitter.dump(&node).context("Failed to emit YAML")?;
    Ok(output)
}

fn to_node(value: &Value) -> Yaml {
    match value {
        Value::Null => Yaml::Null,
        Value::Bool(flag) => Yaml::Boolean(*flag),
        Value::Number(number) => number_node(number),
        Value::String(text) => Yaml::String(text.clone()),
        Value::Sequence(items) => Yaml::Array(items.iter().map(to_node).collect()),
        Value::Mapping(fields) => Yaml::Hash(
            fields
                .iter()
                .map(|(key, field)| (to_node(key), to_node(field)))
                .collect(),
        ),
        // enum variants serialize as plain strings; a tag only wraps payloads
        Value::Tagged(tagged) => to_node(&tagged.value),
    }
}

/// Integers that fit `i64` stay integers; anything else (large counts,
/// thresholds) is written as its decimal text.
fn number_node(number: &Number) -> Yaml {
    number
        .as_i64()
        .map_or_else(|| Yaml::Real(number.to_string()), Yaml::Integer)
}

/// Parses YAML produced by [`to_yaml`].
pub fn from_yaml<T: for<'de> Deserialize<'de>>(yaml: &str) -> Result<T> {
    serde_yaml::from_str(yaml).context("Failed to deserialize YAML")
}

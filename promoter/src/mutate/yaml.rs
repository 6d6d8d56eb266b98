//! Key assignment strategy

use std::path::Path;

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::config::TargetFile;
use crate::errors::PromoterError;
use crate::filesys::file::File;
use crate::mutate::registry::{read_target, Replacer};

/// Assigns the value to a top-level key of a YAML mapping
pub struct YamlReplacer;

/// Parse `content` as a mapping, set `key` to `value` and re-serialize.
///
/// The key is created when absent; an existing value of any type is replaced
/// by the string value.
pub fn yaml_assign(content: &str, key: &str, value: &str) -> Result<String, PromoterError> {
    let parsed = if content.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str::<Value>(content)?
    };
    let mut mapping = match parsed {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(PromoterError::MutationError(format!(
                "expected a YAML mapping, found {}",
                kind_of(&other)
            )))
        }
    };
    mapping.insert(Value::String(key.to_string()), Value::String(value.to_string()));
    Ok(serde_yaml::to_string(&Value::Mapping(mapping))?)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[async_trait]
impl Replacer for YamlReplacer {
    fn name(&self) -> &'static str {
        "yaml"
    }

    async fn apply(&self, path: &Path, target: &TargetFile, value: &str) -> Result<(), PromoterError> {
        if target.key.is_empty() {
            return Err(PromoterError::MutationError(format!(
                "yaml replacer for {} requires a key",
                target.path
            )));
        }
        let content = read_target(path).await?;
        let result = yaml_assign(&content, &target.key, value).map_err(|e| match e {
            PromoterError::YamlError(e) => {
                PromoterError::MutationError(format!("error parsing {}: {}", path.display(), e))
            }
            other => other,
        })?;
        debug!("set {} in {}", target.key, path.display());
        File::new(path).write_atomic(result.as_bytes()).await
    }
}

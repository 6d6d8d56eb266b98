//! Pattern substitution strategy

use std::path::Path;

use async_trait::async_trait;
use regex::{NoExpand, Regex};
use tracing::debug;

use crate::config::TargetFile;
use crate::errors::PromoterError;
use crate::filesys::file::File;
use crate::mutate::registry::{read_target, Replacer};

/// Replaces every match of `regex.pattern` with `regex.tmpl` followed by the value
pub struct RegexReplacer;

/// Substitute every non-overlapping match of `pattern` with `tmpl + value`.
///
/// The replacement is literal; `$` sequences are not expanded.
pub fn regex_replace(
    content: &str,
    pattern: &str,
    tmpl: &str,
    value: &str,
) -> Result<String, PromoterError> {
    let regex = Regex::new(pattern).map_err(|e| {
        PromoterError::MutationError(format!("invalid pattern {:?}: {}", pattern, e))
    })?;
    let replacement = format!("{}{}", tmpl, value);
    Ok(regex
        .replace_all(content, NoExpand(replacement.as_str()))
        .into_owned())
}

#[async_trait]
impl Replacer for RegexReplacer {
    fn name(&self) -> &'static str {
        "regex"
    }

    async fn apply(&self, path: &Path, target: &TargetFile, value: &str) -> Result<(), PromoterError> {
        let content = read_target(path).await?;
        let result = regex_replace(&content, &target.regex.pattern, &target.regex.tmpl, value)?;
        debug!("regex replace in {} (pattern {:?})", path.display(), target.regex.pattern);
        File::new(path).write_atomic(result.as_bytes()).await
    }
}

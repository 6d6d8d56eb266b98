//! Strategy registry and dispatcher

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::TargetFile;
use crate::errors::PromoterError;
use crate::filesys::file::File;
use crate::mutate::regex::RegexReplacer;
use crate::mutate::yaml::YamlReplacer;

/// A named file mutation strategy
#[async_trait]
pub trait Replacer: Send + Sync {
    /// Name matched against `TargetFile::replacer`
    fn name(&self) -> &'static str;

    /// Rewrite the file at `path` so it carries `value`
    async fn apply(&self, path: &Path, target: &TargetFile, value: &str) -> Result<(), PromoterError>;
}

/// Maps strategy names to handlers
pub struct ReplacerRegistry {
    replacers: HashMap<String, Box<dyn Replacer>>,
}

impl ReplacerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            replacers: HashMap::new(),
        }
    }

    /// Registry with the `regex` and `yaml` strategies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RegexReplacer));
        registry.register(Box::new(YamlReplacer));
        registry
    }

    /// Register a strategy, replacing any previous one with the same name
    pub fn register(&mut self, replacer: Box<dyn Replacer>) {
        self.replacers.insert(replacer.name().to_string(), replacer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Replacer> {
        self.replacers.get(name).map(|r| r.as_ref())
    }

    /// Apply every target file in order under `base_path`; stops at the first failure.
    pub async fn apply_all(
        &self,
        target_files: &[TargetFile],
        base_path: &Path,
        value: &str,
    ) -> Result<(), PromoterError> {
        for target in target_files {
            let replacer = self.get(&target.replacer).ok_or_else(|| {
                PromoterError::ConfigError(format!("invalid replacer: {}", target.replacer))
            })?;
            let path = base_path.join(&target.path);
            info!("updating {} with {} replacer", path.display(), replacer.name());
            replacer.apply(&path, target, value).await?;
        }
        Ok(())
    }
}

impl Default for ReplacerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Read a target file, reporting a missing file by path
pub(crate) async fn read_target(path: &Path) -> Result<String, PromoterError> {
    match File::new(path).read_string().await {
        Ok(content) => Ok(content),
        Err(PromoterError::IoError(e)) if e.kind() == ErrorKind::NotFound => Err(
            PromoterError::MutationError(format!("target file {} not found", path.display())),
        ),
        Err(e) => Err(e),
    }
}

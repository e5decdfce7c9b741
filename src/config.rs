//! YAML configuration for a filter app.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::FilterName;
use crate::library::{ShaderLayout, ShaderSources, ShaderVariant};

/// Everything needed to bring up a [`FilterApp`](crate::FilterApp).
///
/// ```yaml
/// width: 1280
/// height: 720
/// shader_root: shaders
/// variant: solution
/// filters: [normal, ripple, custom]
/// initial_filter: ripple
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Drawing-buffer width in pixels.
    pub width: u32,
    /// Drawing-buffer height in pixels.
    pub height: u32,
    /// Directory holding the shader files.
    pub shader_root: String,
    /// Standard shaders or the `solution/` copies.
    pub variant: ShaderVariant,
    /// Filters to load, in load order.
    pub filters: Vec<FilterName>,
    /// Filter shown on the first frame.
    pub initial_filter: FilterName,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            shader_root: "shaders".to_owned(),
            variant: ShaderVariant::Standard,
            filters: FilterName::ALL.to_vec(),
            initial_filter: FilterName::Normal,
        }
    }
}

impl RendererConfig {
    /// Parse and validate a YAML document. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML, unknown fields or filter
    /// names, or a config that fails [`validate`](Self::validate).
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_yaml_str`](Self::from_yaml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the drawing buffer is non-empty and the initial filter will be
    /// loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "drawing buffer must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.filters.is_empty() {
            return Err(Error::Config("no filters configured".to_owned()));
        }
        if !self.filters.contains(&self.initial_filter) {
            return Err(Error::Config(format!(
                "initial filter `{}` is not among the loaded filters",
                self.initial_filter
            )));
        }
        Ok(())
    }

    /// The shader file layout this config describes.
    #[must_use]
    pub fn layout(&self) -> ShaderLayout {
        ShaderLayout::new(self.shader_root.clone(), self.variant)
    }

    /// Source paths for every configured filter.
    #[must_use]
    pub fn shader_sources(&self) -> ShaderSources {
        ShaderSources::conventional(&self.layout(), &self.filters)
    }
}

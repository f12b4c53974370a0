//! Recipe files: an ordered list of unit operations applied to one input.
//!
//! ```toml
//! [[steps]]
//! command = "gdal_translate"
//! [steps.options]
//! ot = "Byte"
//! of = "GTiff"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use rasterchain_core::{CommandTemplate, OperationOptions};

#[derive(Debug, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeStep {
    pub command: String,
    #[serde(default)]
    pub options: OperationOptions,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid recipe {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let recipe: Recipe = toml::from_str(content)?;
        recipe.check()?;
        Ok(recipe)
    }

    /// Rejects recipes that could never build a curried step.
    fn check(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("recipe has no steps");
        }
        for (i, step) in self.steps.iter().enumerate() {
            CommandTemplate::parse(&step.command)
                .with_context(|| format!("step {}: bad command", i + 1))?;
            if step.options.contains_key("src") {
                bail!("step {}: 'src' is supplied by the previous step", i + 1);
            }
            if !step.options.contains_key("dst") && !step.options.contains_key("of") {
                bail!("step {}: needs 'dst' or 'of'", i + 1);
            }
        }
        Ok(())
    }
}

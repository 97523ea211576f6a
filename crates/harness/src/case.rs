//! Declarative YAML test cases
//!
//! ```yaml
//! name: weights
//! description: Formats product weights
//! scenarios:
//!   - description: Weight of 1.30
//!     template: "{%- render 'example', value: 'weight:1.30' -%}"
//!     expected: "1.3"
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::context::TestContext;
use crate::error::{HarnessError, HarnessResult};
use crate::lifecycle::TestCase;

/// A test case parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSpec {
    /// Name for this case
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Scenarios rendered and asserted in order
    pub scenarios: Vec<Scenario>,
}

/// One render + equality assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique within the case; used as the tracker key
    pub description: String,

    /// Liquid rendered through a fresh render target
    pub template: String,

    /// Exact text the render must produce
    pub expected: String,

    /// Trim surrounding whitespace from the rendered text before comparing
    #[serde(default)]
    pub trim: bool,
}

impl CaseSpec {
    /// Parse a case from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a case from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Descriptions key tracked outcomes, so they must be unique
    fn validate(&self) -> HarnessResult<()> {
        let mut seen = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.description.as_str()) {
                return Err(HarnessError::Config(format!(
                    "case '{}' repeats scenario description '{}'",
                    self.name, scenario.description
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TestCase for CaseSpec {
    async fn run(&self, ctx: &mut TestContext) -> anyhow::Result<()> {
        for scenario in &self.scenarios {
            let rendered = ctx.render(&scenario.template).await?;
            let actual = rendered.as_deref().map(|text| {
                if scenario.trim {
                    text.trim()
                } else {
                    text
                }
            });
            ctx.assert_eq(scenario.description.as_str(), &scenario.expected, actual)?;
        }
        Ok(())
    }
}

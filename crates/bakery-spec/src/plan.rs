//! Fully-resolved execution plans.

use serde::{Deserialize, Serialize};

use bakery_common::error::Result;
use bakery_common::types::BuildStamp;

use crate::document::{BuilderSpec, ProvisionStep};

/// One fully-resolved build target, ready to hand to an external
/// image-building engine.
///
/// Every placeholder in the builder and its steps has been substituted, and
/// the step sequence is filtered to those applicable to this builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// The builder with all variable references substituted.
    pub builder: BuilderSpec,
    /// The applicable provision steps, in document order.
    pub provisioners: Vec<ProvisionStep>,
    /// The build stamp used for `{{timestamp}}`/`{{isotime}}` substitution.
    pub stamp: BuildStamp,
}

impl ExecutionPlan {
    /// Returns the builder name this plan targets.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.builder.name
    }

    /// Serializes the plan as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

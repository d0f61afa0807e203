//! Structural validation of a parsed build-spec document.
//!
//! Runs once at load time, before any variable resolution. Checks for
//! duplicate builder names, empty builder lists, and provision steps whose
//! applicability set names an undeclared builder.

use std::collections::HashSet;

use bakery_common::error::{BakeryError, Result};

use crate::document::SpecDocument;

/// Validates a parsed document for semantic correctness.
///
/// # Checks performed
///
/// 1. At least one builder is declared.
/// 2. No duplicate builder names, and no empty provider type.
/// 3. Every `only` entry on a provision step names a declared builder.
///
/// # Errors
///
/// Returns an error if any semantic check fails.
pub fn validate(doc: &SpecDocument) -> Result<()> {
    tracing::info!(
        builders = doc.builders.len(),
        provisioners = doc.provisioners.len(),
        "validating build spec"
    );
    check_builders_present(doc)?;
    check_builder_declarations(doc)?;
    check_step_applicability(doc)?;
    Ok(())
}

fn check_builders_present(doc: &SpecDocument) -> Result<()> {
    if doc.builders.is_empty() {
        return Err(BakeryError::MalformedSpec {
            message: "document declares no builders".to_owned(),
        });
    }
    Ok(())
}

fn check_builder_declarations(doc: &SpecDocument) -> Result<()> {
    let mut seen = HashSet::new();
    for builder in &doc.builders {
        if !seen.insert(builder.name.as_str()) {
            return Err(BakeryError::MalformedSpec {
                message: format!("duplicate builder name: \"{}\"", builder.name),
            });
        }
        if builder.builder_type.is_empty() {
            return Err(BakeryError::MalformedSpec {
                message: format!("builder \"{}\" has an empty provider type", builder.name),
            });
        }
    }
    Ok(())
}

fn check_step_applicability(doc: &SpecDocument) -> Result<()> {
    let names: HashSet<&str> = doc.builders.iter().map(|b| b.name.as_str()).collect();

    for (index, step) in doc.provisioners.iter().enumerate() {
        let Some(only) = step.only() else { continue };
        for builder in only {
            if !names.contains(builder.as_str()) {
                return Err(BakeryError::ApplicabilityMismatch {
                    step: format!("provisioner #{index} ({})", step.type_name()),
                    builder: builder.clone(),
                });
            }
        }
    }
    Ok(())
}

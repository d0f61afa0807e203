//! # bakery-spec
//!
//! Compiler for declarative machine-image build specifications.
//!
//! Handles:
//! - **Document**: serde model of the `variables`/`builders`/`provisioners`
//!   document format.
//! - **Template**: nom parser and expansion of `{{...}}` placeholder tokens.
//! - **Validator**: structural checks run once at load time.
//! - **Variables**: layered default/environment/override resolution.
//! - **Resolver**: turns a loaded document plus overrides into one fully
//!   substituted [`plan::ExecutionPlan`] per builder.

pub mod document;
pub mod plan;
pub mod resolver;
pub mod template;
pub mod validator;
pub mod variables;

pub use document::{BlockDeviceMapping, BuilderSpec, ProvisionStep, SpecDocument};
pub use plan::ExecutionPlan;
pub use resolver::SpecResolver;
pub use variables::{EnvSource, ProcessEnv, ResolvedVariables};

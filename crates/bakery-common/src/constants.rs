//! System-wide constants.

/// Default build-spec document filename.
pub const DEFAULT_TEMPLATE_FILE: &str = "template.json";

/// Provision step type for inline shell commands.
pub const STEP_TYPE_SHELL: &str = "shell";

/// Provision step type for a local ansible playbook run.
pub const STEP_TYPE_ANSIBLE_LOCAL: &str = "ansible-local";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "bake";

//! `bake validate` — Load a build spec and report structural problems.

use std::path::PathBuf;

use clap::Args;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the build-spec document.
    #[arg(default_value = bakery_common::constants::DEFAULT_TEMPLATE_FILE)]
    pub file: PathBuf,
}

/// Executes the `validate` command.
///
/// # Errors
///
/// Returns an error if the document cannot be read, parsed, or validated.
pub fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    tracing::info!(file = %args.file.display(), "validating build spec");
    let resolver = bakery_spec::SpecResolver::from_path(&args.file)?;
    let doc = resolver.document();
    println!(
        "{}: OK ({} variable(s), {} builder(s), {} provisioner(s))",
        args.file.display(),
        doc.variables.len(),
        doc.builders.len(),
        doc.provisioners.len()
    );
    Ok(())
}

//! `bake inspect` — List the contents of a build spec without resolving it.

use std::path::PathBuf;

use clap::Args;

use crate::output;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the build-spec document.
    #[arg(default_value = bakery_common::constants::DEFAULT_TEMPLATE_FILE)]
    pub file: PathBuf,
}

/// Executes the `inspect` command.
///
/// Prints the operator-facing view of the document: variables with their
/// defaults, builders with their provider parameters, and the provision
/// step sequence.
///
/// # Errors
///
/// Returns an error if the document cannot be read, parsed, or validated.
pub fn execute(args: InspectArgs) -> anyhow::Result<()> {
    let resolver = bakery_spec::SpecResolver::from_path(&args.file)?;
    let doc = resolver.document();

    println!("Build spec: {}", args.file.display());

    println!();
    println!("Variables:");
    for (name, default) in &doc.variables {
        println!("  {} = {}", name, output::format_default(default));
    }

    println!();
    println!("Builders:");
    for builder in &doc.builders {
        println!("  {} ({})", builder.name, builder.builder_type);
        println!("      region: {}", builder.region);
        println!("      source_ami: {}", output::format_default(&builder.source_ami));
        if let Some(ref instance_type) = builder.instance_type {
            println!("      instance_type: {instance_type}");
        }
        if let Some(ref ami_name) = builder.ami_name {
            println!("      ami_name: {ami_name}");
        }
    }

    println!();
    println!("Provisioners:");
    for step in &doc.provisioners {
        println!("  {}", output::describe_step(step));
    }

    Ok(())
}

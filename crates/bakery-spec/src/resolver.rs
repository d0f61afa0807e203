//! The spec resolver: document + overrides → execution plans.
//!
//! Resolution is a pure transform executed once per invocation: no shared
//! mutable state, no I/O beyond the one-time document read.

use std::collections::BTreeMap;
use std::path::Path;

use bakery_common::error::{BakeryError, Result};
use bakery_common::types::{BuildStamp, BuilderName};

use crate::document::{BlockDeviceMapping, BuilderSpec, ProvisionStep, SpecDocument};
use crate::plan::ExecutionPlan;
use crate::template;
use crate::validator;
use crate::variables::{self, EnvSource, ResolvedVariables};

/// A loaded and validated build spec, ready to resolve.
#[derive(Debug, Clone)]
pub struct SpecResolver {
    doc: SpecDocument,
}

impl SpecResolver {
    /// Parses and validates a document from its JSON source text.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::MalformedSpec`] or
    /// [`BakeryError::ApplicabilityMismatch`] for structural violations.
    pub fn load(input: &str) -> Result<Self> {
        let doc = SpecDocument::parse(input)?;
        validator::validate(&doc)?;
        Ok(Self { doc })
    }

    /// Reads, parses, and validates a document from a file.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::Io`] if the file cannot be read, plus the
    /// [`load`](Self::load) failure modes.
    pub fn from_path(path: &Path) -> Result<Self> {
        let doc = SpecDocument::from_path(path)?;
        validator::validate(&doc)?;
        Ok(Self { doc })
    }

    /// Returns the loaded document.
    #[must_use]
    pub const fn document(&self) -> &SpecDocument {
        &self.doc
    }

    /// Resolves every builder into an [`ExecutionPlan`].
    ///
    /// All plans share one build stamp, captured here.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::UnresolvedVariable`] if any referenced
    /// variable has no value through any precedence layer.
    pub fn resolve(
        &self,
        env: &dyn EnvSource,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Vec<ExecutionPlan>> {
        tracing::info!(builders = self.doc.builders.len(), "resolving build spec");
        let vars = variables::resolve(&self.doc.variables, env, overrides)?;
        let stamp = BuildStamp::now();
        self.doc
            .builders
            .iter()
            .map(|builder| self.build_plan(builder, &vars, env, &stamp))
            .collect()
    }

    /// Resolves a single named builder into an [`ExecutionPlan`].
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::ApplicabilityMismatch`] if no builder has the
    /// given name, plus the [`resolve`](Self::resolve) failure modes.
    pub fn resolve_builder(
        &self,
        name: &BuilderName,
        env: &dyn EnvSource,
        overrides: &BTreeMap<String, String>,
    ) -> Result<ExecutionPlan> {
        let builder = self
            .doc
            .builders
            .iter()
            .find(|b| b.name == name.as_str())
            .ok_or_else(|| BakeryError::ApplicabilityMismatch {
                step: "builder selection".to_owned(),
                builder: name.to_string(),
            })?;
        let vars = variables::resolve(&self.doc.variables, env, overrides)?;
        let stamp = BuildStamp::now();
        self.build_plan(builder, &vars, env, &stamp)
    }

    fn build_plan(
        &self,
        builder: &BuilderSpec,
        vars: &ResolvedVariables,
        env: &dyn EnvSource,
        stamp: &BuildStamp,
    ) -> Result<ExecutionPlan> {
        tracing::debug!(builder = %builder.name, "building execution plan");
        let mut resolved = builder.clone();
        let name = &builder.name;

        resolved.builder_type = expand_field(&builder.builder_type, "type", name, vars, stamp)?;
        resolved.region = expand_field(&builder.region, "region", name, vars, stamp)?;
        resolved.source_ami = expand_field(&builder.source_ami, "source_ami", name, vars, stamp)?;
        resolved.region = backfill_required(resolved.region, "region", name, vars, env)?;
        resolved.source_ami = backfill_required(resolved.source_ami, "source_ami", name, vars, env)?;

        resolved.access_key = expand_opt(&builder.access_key, "access_key", name, vars, stamp)?;
        resolved.secret_key = expand_opt(&builder.secret_key, "secret_key", name, vars, stamp)?;
        resolved.instance_type =
            expand_opt(&builder.instance_type, "instance_type", name, vars, stamp)?;
        resolved.ssh_username =
            expand_opt(&builder.ssh_username, "ssh_username", name, vars, stamp)?;
        resolved.ami_name = expand_opt(&builder.ami_name, "ami_name", name, vars, stamp)?;
        resolved.vpc_id = expand_opt(&builder.vpc_id, "vpc_id", name, vars, stamp)?;
        resolved.subnet_id = expand_opt(&builder.subnet_id, "subnet_id", name, vars, stamp)?;
        resolved.user_data_file =
            expand_opt(&builder.user_data_file, "user_data_file", name, vars, stamp)?;
        resolved.tags = expand_tags(builder.tags.as_ref(), "tags", name, vars, stamp)?;
        resolved.run_tags = expand_tags(builder.run_tags.as_ref(), "run_tags", name, vars, stamp)?;
        resolved.ami_block_device_mappings = expand_mappings(
            builder.ami_block_device_mappings.as_ref(),
            name,
            vars,
            stamp,
        )?;

        let provisioners = self
            .doc
            .provisioners
            .iter()
            .filter(|step| step.applies_to(name))
            .enumerate()
            .map(|(index, step)| expand_step(step, index, vars, stamp))
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutionPlan {
            builder: resolved,
            provisioners,
            stamp: stamp.clone(),
        })
    }
}

fn field_context(builder: &str, field: &str) -> String {
    format!("builder \"{builder}\" field `{field}`")
}

fn expand_field(
    value: &str,
    field: &str,
    builder: &str,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
) -> Result<String> {
    template::expand(value, vars, stamp, &field_context(builder, field))
}

fn expand_opt(
    value: &Option<String>,
    field: &str,
    builder: &str,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
) -> Result<Option<String>> {
    value
        .as_deref()
        .map(|v| expand_field(v, field, builder, vars, stamp))
        .transpose()
}

fn expand_tags(
    tags: Option<&BTreeMap<String, String>>,
    field: &str,
    builder: &str,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
) -> Result<Option<BTreeMap<String, String>>> {
    let Some(tags) = tags else { return Ok(None) };
    let mut out = BTreeMap::new();
    for (key, value) in tags {
        let context = format!("builder \"{builder}\" {field} key \"{key}\"");
        let _ = out.insert(key.clone(), template::expand(value, vars, stamp, &context)?);
    }
    Ok(Some(out))
}

fn expand_mappings(
    mappings: Option<&Vec<BlockDeviceMapping>>,
    builder: &str,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
) -> Result<Option<Vec<BlockDeviceMapping>>> {
    let Some(mappings) = mappings else { return Ok(None) };
    mappings
        .iter()
        .map(|mapping| {
            Ok(BlockDeviceMapping {
                device_name: expand_field(
                    &mapping.device_name,
                    "ami_block_device_mappings.device_name",
                    builder,
                    vars,
                    stamp,
                )?,
                virtual_name: expand_opt(
                    &mapping.virtual_name,
                    "ami_block_device_mappings.virtual_name",
                    builder,
                    vars,
                    stamp,
                )?,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// A required field that expanded to empty falls back to an override or
/// environment value keyed by the field's own name; still empty is an
/// unresolved-variable error, never a silently-empty plan.
fn backfill_required(
    value: String,
    field: &str,
    builder: &str,
    vars: &ResolvedVariables,
    env: &dyn EnvSource,
) -> Result<String> {
    if !value.is_empty() {
        return Ok(value);
    }
    vars.get(field)
        .map(str::to_owned)
        .or_else(|| env.get(field).filter(|v| !v.is_empty()))
        .ok_or_else(|| BakeryError::UnresolvedVariable {
            variable: field.to_owned(),
            context: field_context(builder, field),
        })
}

fn expand_step(
    step: &ProvisionStep,
    index: usize,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
) -> Result<ProvisionStep> {
    let context = format!("provisioner #{index} ({})", step.type_name());
    let expand = |value: &str| template::expand(value, vars, stamp, &context);
    match step {
        ProvisionStep::Shell { inline, .. } => Ok(ProvisionStep::Shell {
            inline: inline.iter().map(|cmd| expand(cmd)).collect::<Result<_>>()?,
            only: None,
        }),
        ProvisionStep::AnsibleLocal {
            playbook_file,
            playbook_dir,
            inventory_file,
            ..
        } => Ok(ProvisionStep::AnsibleLocal {
            playbook_file: expand(playbook_file)?,
            playbook_dir: expand(playbook_dir)?,
            inventory_file: expand(inventory_file)?,
            only: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    const DOC: &str = r#"{
        "variables": {
            "aws_region": "us-east-1",
            "aws_ssh_username": "ubuntu",
            "aws_ubuntu_ami": ""
        },
        "builders": [
            {
                "name": "mesos-leader",
                "type": "amazon-ebs",
                "region": "{{user `aws_region`}}",
                "source_ami": "{{user `aws_ubuntu_ami`}}",
                "instance_type": "m3.large",
                "ssh_username": "{{user `aws_ssh_username`}}",
                "ami_name": "mesos-leader-{{timestamp}}",
                "tags": {"Name": "mesos-leader", "Created": "{{ isotime }}"}
            },
            {
                "name": "mesos-follower",
                "type": "amazon-ebs",
                "region": "{{user `aws_region`}}",
                "source_ami": "{{user `aws_ubuntu_ami`}}",
                "instance_type": "m3.large",
                "ssh_username": "{{user `aws_ssh_username`}}",
                "ami_name": "mesos-follower-{{timestamp}}"
            }
        ],
        "provisioners": [
            {"type": "shell", "inline": ["sleep 5"]},
            {
                "type": "ansible-local",
                "playbook_file": "ansible/leader.yml",
                "playbook_dir": "ansible",
                "inventory_file": "ansible/inventory/packer-leader",
                "only": ["mesos-leader"]
            }
        ]
    }"#;

    #[test]
    fn resolve_substitutes_variables_and_stamp() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let plans = resolver
            .resolve(&map(&[]), &map(&[("aws_ubuntu_ami", "ami-456")]))
            .expect("should resolve");
        assert_eq!(plans.len(), 2);

        let leader = &plans[0];
        assert_eq!(leader.builder.region, "us-east-1");
        assert_eq!(leader.builder.source_ami, "ami-456");
        assert_eq!(leader.builder.ssh_username.as_deref(), Some("ubuntu"));
        let ami_name = leader.builder.ami_name.as_deref().expect("ami_name");
        assert!(ami_name.starts_with("mesos-leader-"), "got: {ami_name}");
        assert!(!ami_name.contains("{{"), "got: {ami_name}");
        let tags = leader.builder.tags.as_ref().expect("tags");
        assert_eq!(tags.get("Created"), Some(&leader.stamp.isotime));
    }

    #[test]
    fn resolve_filters_steps_by_applicability() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let plans = resolver
            .resolve(&map(&[]), &map(&[("aws_ubuntu_ami", "ami-456")]))
            .expect("should resolve");

        let leader = plans.iter().find(|p| p.name() == "mesos-leader").expect("leader");
        let follower = plans
            .iter()
            .find(|p| p.name() == "mesos-follower")
            .expect("follower");
        assert_eq!(leader.provisioners.len(), 2);
        assert_eq!(follower.provisioners.len(), 1);
        assert_eq!(follower.provisioners[0].type_name(), "shell");
    }

    #[test]
    fn resolve_unset_variable_fails_with_context() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let err = resolver.resolve(&map(&[]), &map(&[])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("aws_ubuntu_ami"), "got: {msg}");
        assert!(msg.contains("mesos-leader"), "got: {msg}");
    }

    #[test]
    fn resolve_env_layer_supplies_unset_variable() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let plans = resolver
            .resolve(&map(&[("aws_ubuntu_ami", "ami-env")]), &map(&[]))
            .expect("should resolve");
        assert_eq!(plans[0].builder.source_ami, "ami-env");
    }

    #[test]
    fn resolve_builder_selects_one_plan() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let plan = resolver
            .resolve_builder(
                &BuilderName::from("mesos-follower"),
                &map(&[]),
                &map(&[("aws_ubuntu_ami", "a")]),
            )
            .expect("should resolve");
        assert_eq!(plan.name(), "mesos-follower");
    }

    #[test]
    fn resolve_unknown_builder_selection_fails() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let err = resolver
            .resolve_builder(&BuilderName::from("ghost"), &map(&[]), &map(&[]))
            .unwrap_err();
        assert!(matches!(err, BakeryError::ApplicabilityMismatch { .. }));
    }

    #[test]
    fn empty_required_field_backfills_from_override() {
        let input = r#"{
            "variables": {"aws_region": "us-east-1"},
            "builders": [
                {
                    "name": "mesos-leader",
                    "type": "amazon-ebs",
                    "region": "{{aws_region}}",
                    "source_ami": "",
                    "instance_type": "m3.large"
                }
            ],
            "provisioners": []
        }"#;
        let resolver = SpecResolver::load(input).expect("should load");
        let plans = resolver
            .resolve(&map(&[]), &map(&[("source_ami", "ami-123")]))
            .expect("should resolve");
        assert_eq!(plans[0].builder.region, "us-east-1");
        assert_eq!(plans[0].builder.source_ami, "ami-123");
    }

    #[test]
    fn empty_required_field_without_supply_fails() {
        let input = r#"{
            "variables": {},
            "builders": [
                {
                    "name": "mesos-leader",
                    "type": "amazon-ebs",
                    "region": "us-east-1",
                    "source_ami": ""
                }
            ],
            "provisioners": []
        }"#;
        let resolver = SpecResolver::load(input).expect("should load");
        let err = resolver.resolve(&map(&[]), &map(&[])).unwrap_err();
        assert!(matches!(err, BakeryError::UnresolvedVariable { .. }), "got: {err}");
    }

    #[test]
    fn block_device_mappings_are_expanded() {
        let input = r#"{
            "variables": {"data_device": "/dev/sdb"},
            "builders": [
                {
                    "name": "mesos-follower",
                    "type": "amazon-ebs",
                    "region": "us-east-1",
                    "source_ami": "ami-123",
                    "ami_block_device_mappings": [
                        {
                            "device_name": "{{user `data_device`}}",
                            "virtual_name": "ephemeral0"
                        }
                    ]
                }
            ],
            "provisioners": []
        }"#;
        let resolver = SpecResolver::load(input).expect("should load");
        let plans = resolver.resolve(&map(&[]), &map(&[])).expect("should resolve");
        let mappings = plans[0]
            .builder
            .ami_block_device_mappings
            .as_ref()
            .expect("mappings");
        assert_eq!(mappings[0].device_name, "/dev/sdb");
        assert_eq!(mappings[0].virtual_name.as_deref(), Some("ephemeral0"));
    }

    #[test]
    fn non_ascii_tag_values_resolve() {
        let input = r#"{
            "variables": {"cluster": "tokyo"},
            "builders": [
                {
                    "name": "mesos-leader",
                    "type": "amazon-ebs",
                    "region": "ap-northeast-1",
                    "source_ami": "ami-123",
                    "tags": {"Name": "日本-{{user `cluster`}}"}
                }
            ],
            "provisioners": []
        }"#;
        let resolver = SpecResolver::load(input).expect("should load");
        let plans = resolver.resolve(&map(&[]), &map(&[])).expect("should resolve");
        let tags = plans[0].builder.tags.as_ref().expect("tags");
        assert_eq!(tags.get("Name"), Some(&"日本-tokyo".to_owned()));
    }

    #[test]
    fn successive_resolutions_get_distinct_image_names() {
        let resolver = SpecResolver::load(DOC).expect("should load");
        let overrides = map(&[("aws_ubuntu_ami", "ami-456")]);
        let first = resolver.resolve(&map(&[]), &overrides).expect("first");
        let second = resolver.resolve(&map(&[]), &overrides).expect("second");
        assert_ne!(
            first[0].builder.ami_name, second[0].builder.ami_name,
            "timestamps must differ across invocations"
        );
    }
}

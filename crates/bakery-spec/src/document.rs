//! Serde model of the build-spec document format.
//!
//! Field names and nesting are wire-exact: any document accepted by the
//! original JSON templates deserializes unchanged, and resolved output
//! serializes back with the same names. Optional fields are omitted from
//! output when absent.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bakery_common::error::{BakeryError, Result};

/// Root of a build-spec document: the three required top-level sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDocument {
    /// Variable defaults, keyed by variable name.
    pub variables: BTreeMap<String, String>,
    /// Machine-image build targets.
    pub builders: Vec<BuilderSpec>,
    /// Ordered post-launch setup steps.
    pub provisioners: Vec<ProvisionStep>,
}

impl SpecDocument {
    /// Parses a document from its JSON source text.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::MalformedSpec`] if the JSON does not parse or
    /// a required section or mandatory builder field is absent. The message
    /// carries serde's line/column location.
    pub fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| BakeryError::MalformedSpec {
            message: e.to_string(),
        })
    }

    /// Reads and parses a document from a file.
    ///
    /// # Errors
    ///
    /// Returns [`BakeryError::Io`] if the file cannot be read, or
    /// [`BakeryError::MalformedSpec`] if it does not parse.
    pub fn from_path(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path).map_err(|source| BakeryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&input)
    }

    /// Returns the declared builder names, in document order.
    #[must_use]
    pub fn builder_names(&self) -> Vec<&str> {
        self.builders.iter().map(|b| b.name.as_str()).collect()
    }
}

/// One machine-image build target.
///
/// `name`, `type`, `region`, and `source_ami` are mandatory; everything else
/// is optional and omitted from serialized output when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderSpec {
    /// Builder name, unique within the document.
    pub name: String,
    /// Provider type (e.g. `amazon-ebs`).
    #[serde(rename = "type")]
    pub builder_type: String,
    /// Access key credential reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    /// Secret key credential reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Target region.
    pub region: String,
    /// Source image identifier the build starts from.
    pub source_ami: String,
    /// Instance size used for the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    /// SSH user for provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_username: Option<String>,
    /// Name template for the generated image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ami_name: Option<String>,
    /// Block device mappings attached to the generated image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ami_block_device_mappings: Option<Vec<BlockDeviceMapping>>,
    /// Tags applied to the generated image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    /// Tags applied to the build-time instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_tags: Option<BTreeMap<String, String>>,
    /// VPC placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    /// Subnet placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    /// Whether the build instance gets a public address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associate_public_ip_address: Option<bool>,
    /// Path to role-specific bootstrap data (cloud-config).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_file: Option<String>,
}

/// One block device mapping on the generated image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockDeviceMapping {
    /// Device name (e.g. `/dev/sdb`).
    pub device_name: String,
    /// Instance-store source volume (e.g. `ephemeral0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_name: Option<String>,
}

/// One ordered post-launch setup step, tagged on its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProvisionStep {
    /// Inline shell commands run over SSH.
    #[serde(rename = "shell")]
    Shell {
        /// Commands executed in order.
        inline: Vec<String>,
        /// Builder names this step applies to; absent means all.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        only: Option<Vec<String>>,
    },
    /// A configuration-management playbook run on the build instance.
    #[serde(rename = "ansible-local")]
    AnsibleLocal {
        /// Path to the playbook.
        playbook_file: String,
        /// Working directory uploaded alongside the playbook.
        playbook_dir: String,
        /// Inventory file for the run.
        inventory_file: String,
        /// Builder names this step applies to; absent means all.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        only: Option<Vec<String>>,
    },
}

impl ProvisionStep {
    /// Returns the wire `type` tag of this step.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Shell { .. } => bakery_common::constants::STEP_TYPE_SHELL,
            Self::AnsibleLocal { .. } => bakery_common::constants::STEP_TYPE_ANSIBLE_LOCAL,
        }
    }

    /// Returns the applicability set, if one was declared.
    #[must_use]
    pub fn only(&self) -> Option<&[String]> {
        match self {
            Self::Shell { only, .. } | Self::AnsibleLocal { only, .. } => only.as_deref(),
        }
    }

    /// Whether this step applies to the named builder.
    ///
    /// A step with no `only` list applies to every builder.
    #[must_use]
    pub fn applies_to(&self, builder: &str) -> bool {
        self.only()
            .is_none_or(|names| names.iter().any(|n| n == builder))
    }
}

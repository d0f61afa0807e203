//! Formatted output helpers for CLI commands.

use bakery_spec::ProvisionStep;

/// Renders a variable default for display, marking empty defaults as
/// requiring supply at resolve time.
#[must_use]
pub fn format_default(value: &str) -> String {
    if value.is_empty() {
        "<required at resolve time>".to_owned()
    } else {
        value.to_owned()
    }
}

/// One-line description of a provision step.
#[must_use]
pub fn describe_step(step: &ProvisionStep) -> String {
    let scope = step.only().map_or_else(String::new, |names| {
        format!(" (only: {})", names.join(", "))
    });
    match step {
        ProvisionStep::Shell { inline, .. } => {
            format!("shell: {} inline command(s){scope}", inline.len())
        }
        ProvisionStep::AnsibleLocal { playbook_file, .. } => {
            format!("ansible-local: {playbook_file}{scope}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_default_marks_empty_values() {
        assert_eq!(format_default(""), "<required at resolve time>");
        assert_eq!(format_default("ubuntu"), "ubuntu");
    }

    #[test]
    fn describe_shell_step_counts_commands() {
        let step = ProvisionStep::Shell {
            inline: vec!["sleep 5".into(), "sudo apt-get update -qq".into()],
            only: None,
        };
        assert_eq!(describe_step(&step), "shell: 2 inline command(s)");
    }

    #[test]
    fn describe_playbook_step_names_scope() {
        let step = ProvisionStep::AnsibleLocal {
            playbook_file: "ansible/leader.yml".into(),
            playbook_dir: "ansible".into(),
            inventory_file: "ansible/inventory/packer-leader".into(),
            only: Some(vec!["mesos-leader".into()]),
        };
        assert_eq!(
            describe_step(&step),
            "ansible-local: ansible/leader.yml (only: mesos-leader)"
        );
    }
}

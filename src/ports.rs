use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::{GroupKind, StepType};

pub const DEFAULT_PORT: &str = "out";
pub const ERROR_PORT: &str = "error";

/// Supplies the declared, ordered output ports of steps and groups.
///
/// Layout treats the returned order as authoritative: targets wired to an
/// earlier port are stacked above targets wired to a later one.
pub trait PortProvider {
    fn step_ports(&self, step_type: &StepType, config: &serde_json::Value) -> Vec<String>;

    fn group_ports(&self, kind: GroupKind) -> Vec<String>;
}

static BUILTIN: Lazy<PortCatalog> = Lazy::new(PortCatalog::default);

/// Built-in port tables with per-type overrides.
#[derive(Debug, Clone, Default)]
pub struct PortCatalog {
    step_overrides: HashMap<String, Vec<String>>,
    group_overrides: HashMap<GroupKind, Vec<String>>,
}

impl PortCatalog {
    pub fn builtin() -> &'static PortCatalog {
        &BUILTIN
    }

    pub fn with_step_ports<I, S>(mut self, step_type: &str, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step_overrides.insert(
            step_type.to_string(),
            ports.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_group_ports<I, S>(mut self, kind: GroupKind, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_overrides
            .insert(kind, ports.into_iter().map(Into::into).collect());
        self
    }
}

impl PortProvider for PortCatalog {
    fn step_ports(&self, step_type: &StepType, config: &serde_json::Value) -> Vec<String> {
        if let Some(ports) = self.step_overrides.get(step_type.as_tag()) {
            return ports.clone();
        }
        match step_type {
            StepType::Switch => dynamic_ports(config, "cases", "case"),
            StepType::Router => dynamic_ports(config, "routes", "route"),
            StepType::Condition => owned(&[DEFAULT_PORT, "out2", ERROR_PORT]),
            StepType::HumanInLoop => owned(&["approved", "rejected", ERROR_PORT]),
            StepType::Llm
            | StepType::Tool
            | StepType::Function
            | StepType::Subflow
            | StepType::Map
            | StepType::Loop
            | StepType::Filter
            | StepType::Aggregate => owned(&[DEFAULT_PORT, ERROR_PORT]),
            StepType::Note => Vec::new(),
            _ => owned(&[DEFAULT_PORT]),
        }
    }

    fn group_ports(&self, kind: GroupKind) -> Vec<String> {
        if let Some(ports) = self.group_overrides.get(&kind) {
            return ports.clone();
        }
        match kind {
            GroupKind::While => owned(&[DEFAULT_PORT]),
            GroupKind::Parallel | GroupKind::TryCatch | GroupKind::Foreach | GroupKind::Agent => {
                owned(&[DEFAULT_PORT, ERROR_PORT])
            }
        }
    }
}

fn owned(ports: &[&str]) -> Vec<String> {
    ports.iter().map(|port| port.to_string()).collect()
}

/// One port per configured branch (`id`, then `name`, then `<prefix>_<i>`),
/// followed by `default`.
fn dynamic_ports(config: &serde_json::Value, key: &str, prefix: &str) -> Vec<String> {
    let mut ports: Vec<String> = config
        .get(key)
        .and_then(|value| value.as_array())
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    entry
                        .get("id")
                        .or_else(|| entry.get("name"))
                        .and_then(|value| value.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{prefix}_{idx}"))
                })
                .collect()
        })
        .unwrap_or_default();
    ports.push("default".to_string());
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn switch_ports_follow_cases() {
        let config = json!({"cases": [{"id": "vip"}, {"name": "trial"}, {}]});
        let ports = PortCatalog::builtin().step_ports(&StepType::Switch, &config);
        assert_eq!(ports, vec!["vip", "trial", "case_2", "default"]);
    }

    #[test]
    fn switch_without_cases_only_has_default() {
        let ports = PortCatalog::builtin().step_ports(&StepType::Switch, &serde_json::Value::Null);
        assert_eq!(ports, vec!["default"]);
    }

    #[test]
    fn group_ports_are_fixed_per_kind() {
        let catalog = PortCatalog::builtin();
        assert_eq!(catalog.group_ports(GroupKind::While), vec!["out"]);
        assert_eq!(catalog.group_ports(GroupKind::TryCatch), vec!["out", "error"]);
    }

    #[test]
    fn condition_declares_two_outputs_then_error() {
        let ports = PortCatalog::builtin().step_ports(&StepType::Condition, &serde_json::Value::Null);
        assert_eq!(ports, vec!["out", "out2", "error"]);
    }

    #[test]
    fn overrides_replace_builtin_tables() {
        let catalog = PortCatalog::default()
            .with_step_ports("condition", ["yes", "no"])
            .with_group_ports(GroupKind::While, ["out", "error"]);
        let ports = catalog.step_ports(&StepType::Condition, &serde_json::Value::Null);
        assert_eq!(ports, vec!["yes", "no"]);
        assert_eq!(catalog.group_ports(GroupKind::While), vec!["out", "error"]);
        assert_eq!(catalog.group_ports(GroupKind::Agent), vec!["out", "error"]);
    }
}

//! Checks a workflow against the canvas invariants: grid alignment,
//! non-overlapping groups, contained members, no strays resting on a
//! foreign group, and resolvable edges.

use serde::Serialize;
use std::fmt;

use crate::config::CanvasConfig;
use crate::geometry::is_on_grid;
use crate::interaction::inner_bounds;
use crate::model::{Endpoint, Workflow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    OffGrid { id: String },
    GroupsOverlap { first: String, second: String },
    MemberOutsideGroup { step_id: String, group_id: String },
    StepOnForeignGroup { step_id: String, group_id: String },
    DanglingEdge { edge_id: String, endpoint: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffGrid { id } => write!(f, "'{id}' is not aligned to the grid"),
            Self::GroupsOverlap { first, second } => {
                write!(f, "groups '{first}' and '{second}' overlap")
            }
            Self::MemberOutsideGroup { step_id, group_id } => {
                write!(f, "step '{step_id}' is not inside its group '{group_id}'")
            }
            Self::StepOnForeignGroup { step_id, group_id } => {
                write!(f, "step '{step_id}' overlaps group '{group_id}' it does not belong to")
            }
            Self::DanglingEdge { edge_id, endpoint } => {
                write!(f, "edge '{edge_id}' references unknown '{endpoint}'")
            }
        }
    }
}

pub fn audit(workflow: &Workflow, config: &CanvasConfig) -> Vec<Violation> {
    let grid = config.grid_size;
    let mut violations = Vec::new();

    for step in &workflow.steps {
        if !is_on_grid(step.position_x, grid) || !is_on_grid(step.position_y, grid) {
            violations.push(Violation::OffGrid {
                id: step.id.clone(),
            });
        }
    }
    for group in &workflow.groups {
        if !is_on_grid(group.position_x, grid) || !is_on_grid(group.position_y, grid) {
            violations.push(Violation::OffGrid {
                id: group.id.clone(),
            });
        }
    }

    for (idx, first) in workflow.groups.iter().enumerate() {
        for second in &workflow.groups[idx + 1..] {
            if first.rect().overlaps(&second.rect()) {
                violations.push(Violation::GroupsOverlap {
                    first: first.id.clone(),
                    second: second.id.clone(),
                });
            }
        }
    }

    for step in &workflow.steps {
        let rect = step.rect(config);
        for group in &workflow.groups {
            let member = step.block_group_id.as_deref() == Some(group.id.as_str());
            if member && !inner_bounds(&group.rect(), config).contains(&rect) {
                violations.push(Violation::MemberOutsideGroup {
                    step_id: step.id.clone(),
                    group_id: group.id.clone(),
                });
            } else if !member && rect.overlaps(&group.rect()) {
                violations.push(Violation::StepOnForeignGroup {
                    step_id: step.id.clone(),
                    group_id: group.id.clone(),
                });
            }
        }
        if let Some(group_id) = &step.block_group_id {
            if workflow.group(group_id).is_none() {
                violations.push(Violation::MemberOutsideGroup {
                    step_id: step.id.clone(),
                    group_id: group_id.clone(),
                });
            }
        }
    }

    for edge in &workflow.edges {
        for endpoint in [&edge.source, &edge.target] {
            let known = match endpoint {
                Endpoint::Step(id) => workflow.step(id).is_some(),
                Endpoint::Group(id) => workflow.group(id).is_some(),
            };
            if !known {
                violations.push(Violation::DanglingEdge {
                    edge_id: edge.id.clone(),
                    endpoint: endpoint.id().to_string(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{BlockGroup, Edge, GroupKind, Step, StepType};

    #[test]
    fn clean_workflow_has_no_violations() {
        let config = CanvasConfig::default();
        let workflow = Workflow {
            steps: vec![
                Step::new("a", StepType::Llm, 40.0, 80.0).in_group("g"),
                Step::new("b", StepType::Tool, 700.0, 100.0),
            ],
            edges: vec![Edge::steps("e", "a", "b")],
            groups: vec![BlockGroup::new(
                "g",
                GroupKind::Agent,
                Rect::new(0.0, 0.0, 280.0, 200.0),
            )],
        };
        assert_eq!(audit(&workflow, &config), Vec::new());
    }

    #[test]
    fn reports_each_broken_invariant() {
        let config = CanvasConfig::default();
        let workflow = Workflow {
            steps: vec![
                Step::new("straddler", StepType::Llm, 0.0, 0.0).in_group("g1"),
                Step::new("stray", StepType::Tool, 100.0, 100.0),
                Step::new("crooked", StepType::Tool, 1003.0, 0.0),
            ],
            edges: vec![Edge::steps("e", "stray", "ghost")],
            groups: vec![
                BlockGroup::new("g1", GroupKind::Parallel, Rect::new(0.0, 0.0, 400.0, 300.0)),
                BlockGroup::new("g2", GroupKind::While, Rect::new(300.0, 200.0, 400.0, 300.0)),
            ],
        };
        let violations = audit(&workflow, &config);
        assert!(violations.contains(&Violation::OffGrid { id: "crooked".into() }));
        assert!(violations.contains(&Violation::GroupsOverlap {
            first: "g1".into(),
            second: "g2".into()
        }));
        assert!(violations.contains(&Violation::MemberOutsideGroup {
            step_id: "straddler".into(),
            group_id: "g1".into()
        }));
        assert!(violations.contains(&Violation::StepOnForeignGroup {
            step_id: "stray".into(),
            group_id: "g1".into()
        }));
        assert!(violations.contains(&Violation::DanglingEdge {
            edge_id: "e".into(),
            endpoint: "ghost".into()
        }));
    }
}

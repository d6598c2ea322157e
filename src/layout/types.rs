use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::changes::{Changeset, GroupUpdate, StepUpdate};
use crate::geometry::{Point, Rect, Size};
use crate::model::{Endpoint, Workflow};

/// Output of [`super::layout_with_groups`]: absolute step origins and group
/// bounds, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub steps: BTreeMap<String, Point>,
    pub groups: BTreeMap<String, Rect>,
}

impl LayoutResult {
    /// Diff against `workflow`, so a layout persists through the same path
    /// as a gesture. Memberships never change during layout.
    pub fn changeset(&self, workflow: &Workflow) -> Changeset {
        let mut changes = Changeset::default();
        for step in &workflow.steps {
            let Some(position) = self.steps.get(&step.id) else {
                continue;
            };
            if step.position().approx_eq(*position) {
                continue;
            }
            changes.steps.insert(
                step.id.clone(),
                StepUpdate {
                    position: *position,
                    parent_group_id: step.block_group_id.clone(),
                },
            );
        }
        for group in &workflow.groups {
            let Some(rect) = self.groups.get(&group.id) else {
                continue;
            };
            let before = group.rect();
            if before.approx_eq(rect) {
                continue;
            }
            changes.groups.insert(
                group.id.clone(),
                GroupUpdate {
                    position: rect.origin(),
                    size: rect.size(),
                    delta: Point::new(rect.x - before.x, rect.y - before.y),
                },
            );
        }
        changes
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LayoutNode {
    pub key: Endpoint,
    pub size: Size,
    /// Declared output ports, in order.
    pub ports: Vec<String>,
}

impl LayoutNode {
    pub fn is_group(&self) -> bool {
        matches!(self.key, Endpoint::Group(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LayoutEdge {
    pub from: usize,
    pub to: usize,
    /// Port on `from` the edge leaves through. `None` for edges rewritten
    /// from a member step onto its group.
    pub port: Option<String>,
}

/// Nodes indexed by declaration order plus the edges between them.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn add_node(&mut self, key: Endpoint, size: Size, ports: Vec<String>) -> usize {
        self.nodes.push(LayoutNode { key, size, ports });
        self.nodes.len() - 1
    }

    /// Adds an edge unless it is a self-loop or a duplicate.
    pub fn add_edge(&mut self, from: usize, to: usize, port: Option<String>) {
        if from == to {
            return;
        }
        let edge = LayoutEdge { from, to, port };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Distinct `(from, to)` pairs, ports ignored.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .map(|edge| (edge.from, edge.to))
            .filter(|pair| seen.insert(*pair))
            .collect()
    }

    /// Declared position of the edge's port, `usize::MAX` when unknown.
    pub fn port_rank(&self, edge: &LayoutEdge) -> usize {
        edge.port
            .as_ref()
            .and_then(|port| self.nodes[edge.from].ports.iter().position(|p| p == port))
            .unwrap_or(usize::MAX)
    }

    pub fn rect(&self, positions: &[Point], node: usize) -> Rect {
        Rect::from_parts(positions[node], self.nodes[node].size)
    }
}

/// Node origins before normalisation, plus the column each node sits in.
#[derive(Debug, Clone, Default)]
pub(crate) struct Placement {
    pub positions: Vec<Point>,
    pub columns: Vec<usize>,
}

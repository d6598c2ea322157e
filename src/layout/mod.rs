//! Automatic left-to-right layout of steps and block groups.
//!
//! Groups are laid out inside-out: every group first arranges its own
//! members, then takes part in the top-level layered layout as one opaque
//! node sized to fit them. All output coordinates are grid aligned.

mod align;
mod group;
mod layered;
mod port_order;
mod ranking;
pub(crate) mod types;
pub use types::LayoutResult;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::{Point, Rect};
use crate::model::{Edge, Endpoint, Step, Workflow};
use crate::ports::{DEFAULT_PORT, PortProvider};
use align::{separate_columns, straighten_group_edges};
use group::{GroupContent, layout_group};
use layered::place_layered;
use port_order::correct_port_order;
use types::{LayoutGraph, Placement};

/// Lays out steps alone, ignoring groups and group endpoints.
pub fn layout<P: PortProvider + ?Sized>(
    steps: &[Step],
    edges: &[Edge],
    ports: &P,
    config: &CanvasConfig,
) -> BTreeMap<String, Point> {
    let mut graph = LayoutGraph::default();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for step in steps {
        let node = graph.add_node(
            Endpoint::Step(step.id.clone()),
            step.size(config),
            ports.step_ports(&step.step_type, &step.config),
        );
        index.insert(step.id.as_str(), node);
    }
    for edge in edges {
        let (Endpoint::Step(from), Endpoint::Step(to)) = (&edge.source, &edge.target) else {
            continue;
        };
        let (Some(from), Some(to)) = (index.get(from.as_str()), index.get(to.as_str())) else {
            continue;
        };
        graph.add_edge(*from, *to, Some(source_port(edge)));
    }

    let placement = place_layered(&graph, config);
    let mut positions = arrange(&graph, placement, config);
    let margin = config.layout.margin;
    normalize(&mut positions, Point::new(margin, margin), config.grid_size);

    graph
        .nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| (node.key.id().to_string(), position))
        .collect()
}

/// Lays out the whole workflow: each group's interior, then ungrouped steps
/// and groups together. Members end up at their group's origin plus their
/// interior offset.
pub fn layout_with_groups<P: PortProvider + ?Sized>(
    workflow: &Workflow,
    ports: &P,
    config: &CanvasConfig,
) -> Result<LayoutResult, CanvasError> {
    workflow.validate()?;

    let contents: Vec<GroupContent> = workflow
        .groups
        .iter()
        .map(|group| layout_group(workflow, group, ports, config))
        .collect();

    let mut graph = LayoutGraph::default();
    let mut index: HashMap<Endpoint, usize> = HashMap::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    for step in &workflow.steps {
        match &step.block_group_id {
            Some(group_id) => {
                parent.insert(step.id.as_str(), group_id.as_str());
            }
            None => {
                let key = Endpoint::Step(step.id.clone());
                let node = graph.add_node(
                    key.clone(),
                    step.size(config),
                    ports.step_ports(&step.step_type, &step.config),
                );
                index.insert(key, node);
            }
        }
    }
    for (group, content) in workflow.groups.iter().zip(&contents) {
        let key = Endpoint::Group(group.id.clone());
        let node = graph.add_node(key.clone(), content.size, ports.group_ports(group.kind));
        index.insert(key, node);
    }

    // Member endpoints collapse onto their group. Edges inside one group
    // become self-loops and are dropped by `add_edge`.
    let resolve = |endpoint: &Endpoint| match endpoint {
        Endpoint::Step(id) => match parent.get(id.as_str()) {
            Some(group_id) => Endpoint::Group(group_id.to_string()),
            None => endpoint.clone(),
        },
        Endpoint::Group(_) => endpoint.clone(),
    };
    for edge in &workflow.edges {
        let from_key = resolve(&edge.source);
        let to_key = resolve(&edge.target);
        let (Some(from), Some(to)) = (index.get(&from_key), index.get(&to_key)) else {
            debug!(edge = %edge.id, "edge endpoint not in workflow, skipped");
            continue;
        };
        let port = (from_key == edge.source).then(|| source_port(edge));
        graph.add_edge(*from, *to, port);
    }

    let placement = place_layered(&graph, config);
    let columns = placement.columns.clone();
    let mut positions = arrange(&graph, placement, config);
    straighten_group_edges(&graph, &mut positions, &columns, config);
    let margin = config.layout.margin;
    normalize(&mut positions, Point::new(margin, margin), config.grid_size);

    let mut result = LayoutResult::default();
    for (node, position) in graph.nodes.iter().zip(&positions) {
        if let Endpoint::Step(id) = &node.key {
            result.steps.insert(id.clone(), *position);
        }
    }
    for (group, content) in workflow.groups.iter().zip(contents) {
        let Some(node) = index.get(&Endpoint::Group(group.id.clone())) else {
            continue;
        };
        let origin = positions[*node];
        result
            .groups
            .insert(group.id.clone(), Rect::from_parts(origin, content.size));
        for (step_id, offset) in content.local {
            result
                .steps
                .insert(step_id, origin.offset(offset.x, offset.y));
        }
    }
    debug!(
        steps = result.steps.len(),
        groups = result.groups.len(),
        "layout complete"
    );
    Ok(result)
}

fn source_port(edge: &Edge) -> String {
    edge.source_port
        .clone()
        .unwrap_or_else(|| DEFAULT_PORT.to_string())
}

/// Port-order correction followed by column separation.
fn arrange(graph: &LayoutGraph, placement: Placement, config: &CanvasConfig) -> Vec<Point> {
    let Placement {
        mut positions,
        columns,
    } = placement;
    correct_port_order(graph, &mut positions, config);
    separate_columns(graph, &mut positions, &columns, config);
    positions
}

/// Shifts positions so the top-left-most box starts at `origin`, then snaps.
fn normalize(positions: &mut [Point], origin: Point, grid: f32) {
    if positions.is_empty() {
        return;
    }
    let min_x = positions.iter().map(|p| p.x).fold(f32::MAX, f32::min);
    let min_y = positions.iter().map(|p| p.y).fold(f32::MAX, f32::min);
    let dx = origin.x - min_x;
    let dy = origin.y - min_y;
    for position in positions.iter_mut() {
        *position = position.offset(dx, dy).snapped(grid);
    }
}

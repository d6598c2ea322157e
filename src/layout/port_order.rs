use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::types::LayoutGraph;
use crate::config::CanvasConfig;
use crate::geometry::{Point, snap_to_grid, snap_up};

/// Vertical centre of a group's `index`-th output port, ports spread evenly
/// along its height.
pub(super) fn port_anchor_y(top: f32, height: f32, index: usize, port_count: usize) -> f32 {
    top + height * (index + 1) as f32 / (port_count + 1) as f32
}

/// Re-stacks the targets of every multi-port source so they read top to
/// bottom in declared port order. Undeclared ports go last.
///
/// Step sources keep their targets' collective centre. Group sources pull
/// each target to the port's anchor, with step and group targets ordered in
/// one pass.
pub(super) fn correct_port_order(graph: &LayoutGraph, positions: &mut [Point], config: &CanvasConfig) {
    for source in 0..graph.nodes.len() {
        // target -> lowest port rank feeding it
        let mut targets: BTreeMap<usize, usize> = BTreeMap::new();
        let mut ports: HashSet<Option<&str>> = HashSet::new();
        for edge in graph.edges.iter().filter(|edge| edge.from == source) {
            let rank = graph.port_rank(edge);
            targets
                .entry(edge.to)
                .and_modify(|current| *current = (*current).min(rank))
                .or_insert(rank);
            ports.insert(edge.port.as_deref());
        }
        if ports.len() < 2 || targets.len() < 2 {
            continue;
        }

        let mut ordered: Vec<(usize, usize)> = targets.into_iter().collect();
        ordered.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then(
                    positions[a.0]
                        .y
                        .partial_cmp(&positions[b.0].y)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.0.cmp(&b.0))
        });

        debug!(
            source = %graph.nodes[source].key.id(),
            targets = ordered.len(),
            "reordering targets by port"
        );
        if graph.nodes[source].is_group() {
            anchor_to_ports(graph, source, &ordered, positions, config);
        } else {
            restack(graph, &ordered, positions, config);
        }
    }
}

fn restack(
    graph: &LayoutGraph,
    ordered: &[(usize, usize)],
    positions: &mut [Point],
    config: &CanvasConfig,
) {
    let spacing = config.layout.node_spacing;
    let top = ordered
        .iter()
        .map(|(node, _)| positions[*node].y)
        .fold(f32::MAX, f32::min);
    let bottom = ordered
        .iter()
        .map(|(node, _)| positions[*node].y + graph.nodes[*node].size.height)
        .fold(f32::MIN, f32::max);
    let total: f32 = ordered
        .iter()
        .map(|(node, _)| graph.nodes[*node].size.height)
        .sum::<f32>()
        + spacing * (ordered.len() - 1) as f32;

    let mut y = (top + bottom) / 2.0 - total / 2.0;
    for (node, _) in ordered {
        positions[*node].y = snap_to_grid(y, config.grid_size);
        y += graph.nodes[*node].size.height + spacing;
    }
}

fn anchor_to_ports(
    graph: &LayoutGraph,
    source: usize,
    ordered: &[(usize, usize)],
    positions: &mut [Point],
    config: &CanvasConfig,
) {
    let grid = config.grid_size;
    let spacing = config.layout.node_spacing;
    let source_rect = graph.rect(positions, source);
    let port_count = graph.nodes[source].ports.len();

    let mut floor = f32::MIN;
    for (node, rank) in ordered {
        let height = graph.nodes[*node].size.height;
        let anchor = if *rank < port_count {
            port_anchor_y(source_rect.y, source_rect.height, *rank, port_count)
        } else {
            source_rect.bottom()
        };
        let mut top = snap_to_grid(anchor - height / 2.0, grid);
        if top < floor {
            top = snap_up(floor, grid);
        }
        positions[*node].y = top;
        floor = top + height + spacing;
    }
}

use tracing::debug;

use super::port_order::port_anchor_y;
use super::types::{LayoutEdge, LayoutGraph};
use crate::config::CanvasConfig;
use crate::geometry::{Point, snap_to_grid, snap_up};

/// Pushes nodes sharing a column apart until consecutive nodes are at least
/// node spacing apart. Nodes only move down, so vertical order is kept.
pub(super) fn separate_columns(
    graph: &LayoutGraph,
    positions: &mut [Point],
    columns: &[usize],
    config: &CanvasConfig,
) {
    let column_count = columns.iter().copied().max().map_or(0, |max| max + 1);
    for column in 0..column_count {
        let mut nodes: Vec<usize> = (0..graph.nodes.len())
            .filter(|node| columns[*node] == column)
            .collect();
        nodes.sort_by(|a, b| {
            positions[*a]
                .y
                .partial_cmp(&positions[*b].y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        let mut floor = f32::MIN;
        for node in nodes {
            if positions[node].y < floor {
                positions[node].y = snap_up(floor, config.grid_size);
            }
            floor = positions[node].y + graph.nodes[node].size.height + config.layout.node_spacing;
        }
    }
}

/// Straightens qualifying one-to-one group edges: the target group moves
/// vertically so its centre lines up with the source's port anchor. Chains
/// are handled source column first; a move that would collide is skipped.
pub(super) fn straighten_group_edges(
    graph: &LayoutGraph,
    positions: &mut [Point],
    columns: &[usize],
    config: &CanvasConfig,
) {
    let mut qualifying: Vec<&LayoutEdge> = graph
        .edges
        .iter()
        .filter(|edge| is_straightenable(graph, edge))
        .collect();
    qualifying.sort_by_key(|edge| (columns[edge.from], edge.from));

    for edge in qualifying {
        let source = graph.rect(positions, edge.from);
        let target = graph.rect(positions, edge.to);
        let rank = graph.port_rank(edge);
        let anchor = port_anchor_y(source.y, source.height, rank, graph.nodes[edge.from].ports.len());
        let top = snap_to_grid(anchor - target.height / 2.0, config.grid_size);
        if (top - target.y).abs() < f32::EPSILON {
            continue;
        }
        let moved = target.with_origin(Point::new(target.x, top));
        let padded = moved.expanded(config.group_gap);
        let blocked = (0..graph.nodes.len())
            .filter(|node| *node != edge.to)
            .any(|node| padded.overlaps(&graph.rect(positions, node)));
        if blocked {
            debug!(
                source = %graph.nodes[edge.from].key.id(),
                target = %graph.nodes[edge.to].key.id(),
                "straight edge alignment skipped, target would collide"
            );
            continue;
        }
        positions[edge.to].y = top;
    }
}

/// Sole outgoing edge of a group source, sole group-to-group edge into its
/// target, leaving through a declared port.
fn is_straightenable(graph: &LayoutGraph, edge: &LayoutEdge) -> bool {
    let source = &graph.nodes[edge.from];
    let target = &graph.nodes[edge.to];
    if !source.is_group() || !target.is_group() {
        return false;
    }
    if graph.port_rank(edge) >= source.ports.len() {
        return false;
    }
    let outgoing = graph.edges.iter().filter(|other| other.from == edge.from).count();
    let incoming_from_groups = graph
        .edges
        .iter()
        .filter(|other| other.to == edge.to && graph.nodes[other.from].is_group())
        .count();
    outgoing == 1 && incoming_from_groups == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::model::Endpoint;

    fn group_node(graph: &mut LayoutGraph, id: &str, w: f32, h: f32) -> usize {
        graph.add_node(
            Endpoint::Group(id.into()),
            Size::new(w, h),
            vec!["out".to_string(), "error".to_string()],
        )
    }

    #[test]
    fn columns_keep_node_spacing() {
        let config = CanvasConfig::default();
        let mut graph = LayoutGraph::default();
        for id in ["a", "b", "c"] {
            graph.add_node(Endpoint::Step(id.into()), Size::new(200.0, 80.0), Vec::new());
        }
        let mut positions = vec![Point::new(0.0, 0.0), Point::new(0.0, 40.0), Point::new(300.0, 40.0)];
        separate_columns(&graph, &mut positions, &[0, 0, 1], &config);
        assert_eq!(positions[0].y, 0.0);
        assert_eq!(positions[1].y, 120.0);
        assert_eq!(positions[2].y, 40.0);
    }

    #[test]
    fn one_to_one_group_edge_becomes_horizontal() {
        let config = CanvasConfig::default();
        let mut graph = LayoutGraph::default();
        let g1 = group_node(&mut graph, "g1", 300.0, 300.0);
        let g2 = group_node(&mut graph, "g2", 300.0, 200.0);
        graph.add_edge(g1, g2, Some("out".into()));
        let mut positions = vec![Point::new(0.0, 0.0), Point::new(400.0, 300.0)];
        straighten_group_edges(&graph, &mut positions, &[0, 1], &config);
        // Anchor of "out" is at 100; the target centre follows.
        assert_eq!(positions[g2].y, 0.0);
    }

    #[test]
    fn fan_out_sources_are_not_straightened() {
        let config = CanvasConfig::default();
        let mut graph = LayoutGraph::default();
        let g1 = group_node(&mut graph, "g1", 300.0, 300.0);
        let g2 = group_node(&mut graph, "g2", 300.0, 200.0);
        let step = graph.add_node(Endpoint::Step("s".into()), Size::new(200.0, 80.0), Vec::new());
        graph.add_edge(g1, g2, Some("out".into()));
        graph.add_edge(g1, step, Some("error".into()));
        let mut positions = vec![Point::new(0.0, 0.0), Point::new(400.0, 300.0), Point::new(400.0, 0.0)];
        straighten_group_edges(&graph, &mut positions, &[0, 1, 1], &config);
        assert_eq!(positions[g2].y, 300.0);
    }

    #[test]
    fn blocked_alignment_is_skipped() {
        let config = CanvasConfig::default();
        let mut graph = LayoutGraph::default();
        let g1 = group_node(&mut graph, "g1", 300.0, 300.0);
        let g2 = group_node(&mut graph, "g2", 300.0, 200.0);
        let other = group_node(&mut graph, "g3", 300.0, 200.0);
        graph.add_edge(g1, g2, Some("out".into()));
        let mut positions = vec![
            Point::new(0.0, 0.0),
            Point::new(400.0, 300.0),
            Point::new(400.0, 60.0),
        ];
        straighten_group_edges(&graph, &mut positions, &[0, 1, 1], &config);
        assert_eq!(positions[g2].y, 300.0);
        assert_eq!(positions[other].y, 60.0);
    }
}

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::layered::place_layered;
use super::types::{LayoutGraph, Placement};
use super::{arrange, normalize};
use crate::config::CanvasConfig;
use crate::geometry::{Point, Rect, Size, snap_up};
use crate::model::{BlockGroup, Endpoint, Workflow};
use crate::ports::{DEFAULT_PORT, PortProvider};

/// Members laid out relative to their group's origin, and the group size
/// that fits them.
#[derive(Debug, Clone)]
pub(super) struct GroupContent {
    pub local: Vec<(String, Point)>,
    pub size: Size,
}

pub(super) fn layout_group<P: PortProvider + ?Sized>(
    workflow: &Workflow,
    group: &BlockGroup,
    ports: &P,
    config: &CanvasConfig,
) -> GroupContent {
    let geometry = &config.group;
    let grid = config.grid_size;

    let mut graph = LayoutGraph::default();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for step in workflow.members(&group.id) {
        let node = graph.add_node(
            Endpoint::Step(step.id.clone()),
            step.size(config),
            ports.step_ports(&step.step_type, &step.config),
        );
        index.insert(step.id.as_str(), node);
    }
    if graph.nodes.is_empty() {
        return GroupContent {
            local: Vec::new(),
            size: Size::new(
                snap_up(group.width.max(geometry.min_width), grid),
                snap_up(group.height.max(geometry.min_height), grid),
            ),
        };
    }

    for edge in &workflow.edges {
        let (Endpoint::Step(from), Endpoint::Step(to)) = (&edge.source, &edge.target) else {
            continue;
        };
        let (Some(from), Some(to)) = (index.get(from.as_str()), index.get(to.as_str())) else {
            continue;
        };
        let port = edge.source_port.clone().unwrap_or_else(|| DEFAULT_PORT.to_string());
        graph.add_edge(*from, *to, Some(port));
    }

    let entries: Vec<usize> = (0..graph.nodes.len())
        .filter(|node| !graph.edges.iter().any(|edge| edge.to == *node))
        .collect();
    let placement = if entries.len() > 1 {
        debug!(group = %group.id, entries = entries.len(), "stacking entry point bands");
        place_bands(&graph, &entries, config)
    } else {
        place_layered(&graph, config)
    };

    let mut positions = arrange(&graph, placement, config);
    let origin = Point::new(
        snap_up(geometry.side_inset(), grid),
        snap_up(geometry.top_inset(), grid),
    );
    normalize(&mut positions, origin, grid);

    let rects: Vec<Rect> = (0..graph.nodes.len())
        .map(|node| graph.rect(&positions, node))
        .collect();
    let content = Rect::union_all(&rects).unwrap_or_default();
    let size = Size::new(
        snap_up(
            (content.right() + geometry.side_inset()).max(geometry.min_width),
            grid,
        ),
        snap_up(
            (content.bottom() + geometry.side_inset()).max(geometry.min_height),
            grid,
        ),
    );

    let local = graph
        .nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| (node.key.id().to_string(), position))
        .collect();
    GroupContent { local, size }
}

/// One horizontal band per entry point, each holding the subgraph reachable
/// from it with one column per breadth-first depth. Members no entry
/// reaches are stacked in the first column below every band.
fn place_bands(graph: &LayoutGraph, entries: &[usize], config: &CanvasConfig) -> Placement {
    let count = graph.nodes.len();
    let spacing = config.layout.node_spacing;
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (from, to) in graph.pairs() {
        outgoing[from].push(to);
    }

    let mut depth: Vec<Option<usize>> = vec![None; count];
    let mut bands: Vec<Vec<usize>> = Vec::new();
    for &entry in entries {
        if depth[entry].is_some() {
            continue;
        }
        depth[entry] = Some(0);
        let mut band = Vec::new();
        let mut queue = VecDeque::from([entry]);
        while let Some(node) = queue.pop_front() {
            band.push(node);
            let next_depth = depth[node].map_or(1, |d| d + 1);
            for &next in &outgoing[node] {
                if depth[next].is_none() {
                    depth[next] = Some(next_depth);
                    queue.push_back(next);
                }
            }
        }
        bands.push(band);
    }
    let unreached: Vec<usize> = (0..count).filter(|node| depth[*node].is_none()).collect();
    let columns: Vec<usize> = depth.iter().map(|d| d.unwrap_or(0)).collect();

    let column_count = columns.iter().copied().max().map_or(1, |max| max + 1);
    let mut widths = vec![0.0_f32; column_count];
    for node in 0..count {
        widths[columns[node]] = widths[columns[node]].max(graph.nodes[node].size.width);
    }
    let mut column_x = Vec::with_capacity(column_count);
    let mut x = 0.0;
    for width in &widths {
        column_x.push(x);
        x += width + config.layout.rank_spacing;
    }
    let place_x = |node: usize| {
        let column = columns[node];
        column_x[column] + (widths[column] - graph.nodes[node].size.width) / 2.0
    };

    let mut positions = vec![Point::default(); count];
    let mut band_top = 0.0;
    for band in &bands {
        let mut cursor = vec![band_top; column_count];
        for &node in band {
            let column = columns[node];
            positions[node] = Point::new(place_x(node), cursor[column]);
            cursor[column] += graph.nodes[node].size.height + spacing;
        }
        let bottom = cursor.iter().copied().fold(band_top, f32::max);
        band_top = bottom;
    }
    if !unreached.is_empty() {
        debug!(count = unreached.len(), "stacking unreachable members");
    }
    for node in unreached {
        positions[node] = Point::new(place_x(node), band_top);
        band_top += graph.nodes[node].size.height + spacing;
    }

    let grid = config.grid_size;
    for position in &mut positions {
        *position = position.snapped(grid);
    }
    Placement { positions, columns }
}

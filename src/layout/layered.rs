use super::ranking::{compute_ranks, order_rank_nodes, rank_buckets};
use super::types::{LayoutGraph, Placement};
use crate::config::CanvasConfig;
use crate::geometry::Point;

/// Left-to-right layered placement. Ranks become columns; each column is
/// stacked with node spacing and centred on a shared horizontal axis, and
/// every node is centred within its column's width.
pub(super) fn place_layered(graph: &LayoutGraph, config: &CanvasConfig) -> Placement {
    let count = graph.nodes.len();
    let pairs = graph.pairs();
    let ranks = compute_ranks(count, &pairs);
    let mut buckets = rank_buckets(&ranks);
    order_rank_nodes(&mut buckets, &pairs, config.layout.ordering_passes);

    let spacing = config.layout.node_spacing;
    let grid = config.grid_size;
    let mut positions = vec![Point::default(); count];
    let mut col_x = 0.0;
    for bucket in &buckets {
        let width = bucket
            .iter()
            .map(|node| graph.nodes[*node].size.width)
            .fold(0.0_f32, f32::max);
        let total: f32 = bucket
            .iter()
            .map(|node| graph.nodes[*node].size.height)
            .sum::<f32>()
            + spacing * bucket.len().saturating_sub(1) as f32;

        let mut y = -total / 2.0;
        for &node in bucket {
            let size = graph.nodes[node].size;
            let x = col_x + (width - size.width) / 2.0;
            positions[node] = Point::new(x, y).snapped(grid);
            y += size.height + spacing;
        }
        col_x += width + config.layout.rank_spacing;
    }

    Placement {
        positions,
        columns: ranks,
    }
}

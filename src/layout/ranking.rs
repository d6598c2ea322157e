use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Longest-path ranks for nodes `0..node_count`. Node index doubles as the
/// declaration order: ready nodes are taken lowest index first, and a cycle
/// is broken at the earliest declared node still unprocessed.
pub(super) fn compute_ranks(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indeg = vec![0usize; node_count];
    for &(from, to) in edges {
        if from == to || from >= node_count || to >= node_count {
            continue;
        }
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..node_count)
        .filter(|idx| indeg[*idx] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(node_count);
    let mut processed = vec![false; node_count];
    loop {
        while let Some(Reverse(node)) = ready.pop() {
            if processed[node] {
                continue;
            }
            order.push(node);
            processed[node] = true;
            for &next in &adj[node] {
                if processed[next] {
                    continue;
                }
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() >= node_count {
            break;
        }

        // Cycle: restart from the earliest remaining node, treating its
        // incoming edges as back-edges.
        match (0..node_count).find(|idx| !processed[*idx]) {
            Some(node) => ready.push(Reverse(node)),
            None => break,
        }
    }

    let mut order_index = vec![0usize; node_count];
    for (pos, node) in order.iter().enumerate() {
        order_index[*node] = pos;
    }

    let mut ranks = vec![0usize; node_count];
    for &node in &order {
        let rank = ranks[node];
        for &next in &adj[node] {
            if order_index[next] <= order_index[node] {
                continue;
            }
            ranks[next] = ranks[next].max(rank + 1);
        }
    }
    ranks
}

/// Groups nodes into rank buckets, each bucket in declaration order.
pub(super) fn rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().map_or(0, |max| max + 1);
    let mut buckets = vec![Vec::new(); depth];
    for (node, rank) in ranks.iter().enumerate() {
        buckets[*rank].push(node);
    }
    buckets
}

/// Median-heuristic crossing reduction: alternating down and up sweeps,
/// ties broken by current slot, then declaration order.
pub(super) fn order_rank_nodes(rank_nodes: &mut [Vec<usize>], edges: &[(usize, usize)], passes: usize) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let node_count = rank_nodes.iter().flatten().copied().max().map_or(0, |max| max + 1);
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for &(from, to) in edges {
        if from == to || from >= node_count || to >= node_count || !seen.insert((from, to)) {
            continue;
        }
        outgoing[from].push(to);
        incoming[to].push(from);
    }

    let mut positions = vec![0usize; node_count];
    let update_positions = |rank_nodes: &[Vec<usize>], positions: &mut [usize]| {
        for bucket in rank_nodes {
            for (slot, node) in bucket.iter().enumerate() {
                positions[*node] = slot;
            }
        }
    };
    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<usize>, neighbors: &[Vec<usize>], positions: &[usize]| {
        let mut scored: Vec<(f32, usize, usize)> = bucket
            .iter()
            .enumerate()
            .map(|(slot, node)| {
                let score = median_position(&neighbors[*node], positions).unwrap_or(slot as f32);
                (score, slot, *node)
            })
            .collect();
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        for (slot, (_, _, node)) in scored.into_iter().enumerate() {
            bucket[slot] = node;
        }
    };

    for _ in 0..passes.max(1) {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len() - 1).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
    }
}

/// Median slot of a node's neighbours in their own ranks.
pub(super) fn median_position(neighbors: &[usize], positions: &[usize]) -> Option<f32> {
    let mut values: Vec<f32> = neighbors
        .iter()
        .filter_map(|neighbor| positions.get(*neighbor).map(|pos| *pos as f32))
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_longest_path() {
        // 0 -> 1 -> 2 and a shortcut 0 -> 2.
        let ranks = compute_ranks(3, &[(0, 1), (1, 2), (0, 2)]);
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn cycles_break_at_earliest_declared_node() {
        let ranks = compute_ranks(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn isolated_nodes_share_rank_zero() {
        let ranks = compute_ranks(3, &[]);
        assert_eq!(rank_buckets(&ranks), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn median_sweep_uncrosses_edges() {
        // Rank 0: [0, 1]; rank 1: [2, 3] wired crosswise.
        let edges = [(0, 3), (1, 2)];
        let mut buckets = vec![vec![0, 1], vec![2, 3]];
        order_rank_nodes(&mut buckets, &edges, 2);
        assert_eq!(buckets[1], vec![3, 2]);
    }

    #[test]
    fn median_of_even_neighbour_count_is_midpoint() {
        let positions = [0, 3, 1, 2];
        assert_eq!(median_position(&[1, 2], &positions), Some(2.0));
        assert_eq!(median_position(&[], &positions), None);
    }
}

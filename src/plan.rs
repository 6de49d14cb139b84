//! Chunk planning
//!
//! Decides how many chunks each node holds and, from that, how many reduce
//! partitions the engine runs. Roughly `replication_factor × input` bytes
//! land on the cluster; dividing by node count and target chunk size gives
//! chunks per node. The result is floored and clamped to at least one chunk.

use serde::{Deserialize, Serialize};

/// Output of [`compute_chunk_plan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Chunks each node will hold (always ≥ 1)
    pub num_chunks_per_node: u32,

    /// Reduce partitions requested from the engine
    /// (`num_nodes × num_chunks_per_node`)
    pub total_parallelism: u32,
}

impl ChunkPlan {
    /// Node that owns a reduce partition
    pub fn node_for_partition(&self, partition: u32) -> u32 {
        partition / self.num_chunks_per_node
    }

    /// Chunk index a reduce partition writes within its node
    pub fn chunk_for_partition(&self, partition: u32) -> u32 {
        partition % self.num_chunks_per_node
    }
}

/// Compute the chunk plan for a build.
///
/// `num_nodes` and `replication_factor` must be at least 1 and
/// `chunk_size_bytes` must already be validated against the chunk size
/// bounds. Chunks per node are capped at `u32::MAX / num_nodes` so the
/// total parallelism always equals `num_nodes × num_chunks_per_node`.
pub fn compute_chunk_plan(
    total_input_bytes: u64,
    replication_factor: u32,
    num_nodes: u32,
    chunk_size_bytes: u64,
) -> ChunkPlan {
    debug_assert!(num_nodes >= 1);
    debug_assert!(replication_factor >= 1);
    debug_assert!(chunk_size_bytes >= 1);

    let replicated = replication_factor as u128 * total_input_bytes as u128;
    let per_node_bytes = num_nodes as u128 * chunk_size_bytes.max(1) as u128;
    let chunks = (replicated / per_node_bytes.max(1)).max(1);

    // Cap so that num_nodes × chunks still fits in a u32
    let max_chunks = (u32::MAX / num_nodes.max(1)) as u128;
    let num_chunks_per_node = chunks.min(max_chunks) as u32;

    ChunkPlan {
        num_chunks_per_node,
        total_parallelism: num_nodes * num_chunks_per_node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;

    #[test]
    fn test_reference_plan() {
        let plan = compute_chunk_plan(10 * GIB, 2, 5, GIB);
        assert_eq!(plan.num_chunks_per_node, 4);
        assert_eq!(plan.total_parallelism, 20);
    }

    #[test]
    fn test_empty_input_still_one_chunk() {
        for (rf, nodes, chunk) in [(1, 1, 1), (3, 7, GIB), (2, 100, 2_040_109_465)] {
            let plan = compute_chunk_plan(0, rf, nodes, chunk);
            assert_eq!(plan.num_chunks_per_node, 1);
            assert_eq!(plan.total_parallelism, nodes);
        }
    }

    #[test]
    fn test_floors_partial_chunks() {
        // 2 × 999 / (1 × 1000) = 1.998
        let plan = compute_chunk_plan(999, 2, 1, 1000);
        assert_eq!(plan.num_chunks_per_node, 1);

        // 3 × 1000 / (2 × 100) = 15
        let plan = compute_chunk_plan(1000, 3, 2, 100);
        assert_eq!(plan.num_chunks_per_node, 15);
        assert_eq!(plan.total_parallelism, 30);
    }

    #[test]
    fn test_huge_input_does_not_overflow() {
        let plan = compute_chunk_plan(u64::MAX, 3, 1, 1 << 40);
        assert_eq!(plan.num_chunks_per_node, 50_331_647);
    }

    #[test]
    fn test_saturated_plan_keeps_parallelism_product() {
        let plan = compute_chunk_plan(5 << 30, 2, 2, 1);
        assert_eq!(plan.num_chunks_per_node, u32::MAX / 2);
        assert_eq!(
            plan.total_parallelism as u64,
            2 * plan.num_chunks_per_node as u64
        );

        for nodes in [1, 3, 7, 1000] {
            let plan = compute_chunk_plan(u64::MAX, 5, nodes, 1);
            assert_eq!(
                plan.total_parallelism as u64,
                nodes as u64 * plan.num_chunks_per_node as u64
            );
            assert!(plan.num_chunks_per_node >= 1);
        }
    }

    #[test]
    fn test_partition_mapping() {
        let plan = compute_chunk_plan(10 * GIB, 2, 5, GIB);
        assert_eq!(plan.node_for_partition(0), 0);
        assert_eq!(plan.chunk_for_partition(0), 0);
        assert_eq!(plan.node_for_partition(7), 1);
        assert_eq!(plan.chunk_for_partition(7), 3);
        assert_eq!(plan.node_for_partition(19), 4);
    }
}

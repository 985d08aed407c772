use crate::entity::{EntityId, FollowsRelation};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cycle detected in follows relations at entity {entity}")]
    CycleDetected { entity: EntityId },
}

/// Follows relations as a DAG, edges pointing predecessor -> successor and
/// weighted with the lag.
pub struct RelationDag {
    graph: DiGraph<EntityId, u32>,
    id_to_index: HashMap<EntityId, NodeIndex>,
    ranks: HashMap<EntityId, usize>,
}

impl RelationDag {
    pub fn build(relations: &[FollowsRelation]) -> Result<Self, GraphError> {
        let mut graph: DiGraph<EntityId, u32> = DiGraph::new();
        let mut id_to_index: HashMap<EntityId, NodeIndex> = HashMap::new();

        // Add nodes first, in id order so the topological order is reproducible
        let ids: BTreeSet<EntityId> = relations
            .iter()
            .flat_map(|relation| [relation.predecessor, relation.successor])
            .collect();
        for id in ids {
            let node_ix = graph.add_node(id);
            id_to_index.insert(id, node_ix);
        }

        for relation in relations {
            if let (Some(&u), Some(&v)) = (
                id_to_index.get(&relation.predecessor),
                id_to_index.get(&relation.successor),
            ) {
                graph.add_edge(u, v, relation.lag);
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected {
            entity: graph[cycle.node_id()],
        })?;
        let ranks = order
            .into_iter()
            .enumerate()
            .map(|(rank, node_ix)| (graph[node_ix], rank))
            .collect();

        Ok(Self {
            graph,
            id_to_index,
            ranks,
        })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Position in topological order; every predecessor ranks lower than its successors.
    pub fn rank(&self, id: EntityId) -> Option<usize> {
        self.ranks.get(&id).copied()
    }

    /// `(successor, lag)` pairs, ordered by successor id.
    pub fn successors(&self, id: EntityId) -> Vec<(EntityId, u32)> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// `(predecessor, lag)` pairs, ordered by predecessor id.
    pub fn predecessors(&self, id: EntityId) -> Vec<(EntityId, u32)> {
        self.neighbors(id, Direction::Incoming)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn neighbors(&self, id: EntityId, direction: Direction) -> Vec<(EntityId, u32)> {
        let Some(&node_ix) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut result: Vec<(EntityId, u32)> = self
            .graph
            .edges_directed(node_ix, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (self.graph[other], *edge.weight())
            })
            .collect();
        result.sort_unstable();
        result
    }
}

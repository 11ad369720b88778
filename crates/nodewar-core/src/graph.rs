use crate::fixed::Fixed64;
use crate::id::*;
use crate::registry::{NodeKind, NodeTypeDef, Registry};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A rejected mutation. The graph is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown node type: {0:?}")]
    UnknownNodeType(NodeTypeId),
    #[error("node {0:?} cannot be tethered to itself")]
    SelfTether(NodeId),
    #[error("nodes {a:?} and {b:?} are already tethered by {existing:?}")]
    AlreadyTethered {
        a: NodeId,
        b: NodeId,
        existing: TetherId,
    },
    #[error("node {node:?} already holds its maximum of {limit} tethers")]
    AdjacencyLimit { node: NodeId, limit: u32 },
}

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("tether not found: {0:?}")]
    TetherNotFound(TetherId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GraphError {
    /// True for lookups by stale or unknown ids.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GraphError::NodeNotFound(_) | GraphError::TetherNotFound(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Per-node data stored in the entity graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// The registry type this node was created from.
    pub node_type: NodeTypeId,
    /// Cached from the type definition so queries need no registry lookup.
    pub kind: NodeKind,
    pub position: Position,
    pub allegiance: Allegiance,
}

/// Per-tether data. Endpoints are arena keys, never owning references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TetherData {
    pub origin: NodeId,
    pub target: NodeId,
}

impl TetherData {
    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.origin == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.origin)
        } else {
            None
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.origin == node || self.target == node
    }
}

/// What `remove_node` took out of the graph.
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub id: NodeId,
    pub data: NodeData,
    pub tethers: Vec<TetherId>,
}

/// Result of checking hub connectivity for every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// Nodes no hub can reach.
    pub unreachable: Vec<NodeId>,
    /// Nodes whose nearest hub is further than the allowed distance.
    pub too_far: Vec<(NodeId, u32)>,
}

impl LayoutReport {
    pub fn is_valid(&self) -> bool {
        self.unreachable.is_empty() && self.too_far.is_empty()
    }
}

/// Normalized key for an unordered node pair.
fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

// ---------------------------------------------------------------------------
// EntityGraph
// ---------------------------------------------------------------------------

/// The canonical registry of nodes and the undirected tethers between them.
///
/// Nodes and tethers live in `SlotMap` arenas; adjacency is a
/// `SecondaryMap` keyed by `NodeId`, so removing a node cannot leave a
/// dangling tether behind. All mutation goes through validated methods that
/// either apply completely or not at all.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    registry: Arc<Registry>,
    nodes: SlotMap<NodeId, NodeData>,
    tethers: SlotMap<TetherId, TetherData>,
    adjacency: SecondaryMap<NodeId, Vec<TetherId>>,
    pairs: HashMap<(NodeId, NodeId), TetherId>,
}

impl EntityGraph {
    /// Create an empty graph whose node types come from `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            nodes: SlotMap::with_key(),
            tethers: SlotMap::with_key(),
            adjacency: SecondaryMap::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a friendly node of the given type.
    ///
    /// # Examples
    ///
    /// ```
    /// use nodewar_core::graph::EntityGraph;
    /// use nodewar_core::id::Position;
    /// use nodewar_core::test_utils::*;
    ///
    /// let mut graph = EntityGraph::new(standard_registry());
    /// let hub = graph.create_node(hub_type(), Position::ORIGIN).unwrap();
    /// let base = graph.create_node(base_type(), Position::new(1.0, 0.0, 0.0)).unwrap();
    /// graph.tether(hub, base).unwrap();
    /// assert!(graph.is_neighbor(base, hub).is_some());
    /// ```
    pub fn create_node(
        &mut self,
        node_type: NodeTypeId,
        position: Position,
    ) -> Result<NodeId, GraphError> {
        self.create_node_as(node_type, position, Allegiance::Friendly)
    }

    /// Create a node of the given type fighting for `allegiance`.
    pub fn create_node_as(
        &mut self,
        node_type: NodeTypeId,
        position: Position,
        allegiance: Allegiance,
    ) -> Result<NodeId, GraphError> {
        let def = self
            .registry
            .get_node_type(node_type)
            .ok_or(ValidationError::UnknownNodeType(node_type))?;
        let kind = def.kind;
        let id = self.nodes.insert(NodeData {
            node_type,
            kind,
            position,
            allegiance,
        });
        self.adjacency.insert(id, Vec::new());
        debug!(node = ?id, ?node_type, ?allegiance, "node created");
        Ok(id)
    }

    /// Link two nodes. Order does not matter for the pair invariant; the
    /// first argument is recorded as the tether's origin.
    pub fn tether(&mut self, a: NodeId, b: NodeId) -> Result<TetherId, GraphError> {
        let a_data = self.nodes.get(a).ok_or(GraphError::NodeNotFound(a))?;
        let b_data = self.nodes.get(b).ok_or(GraphError::NodeNotFound(b))?;
        if a == b {
            return Err(ValidationError::SelfTether(a).into());
        }
        if let Some(&existing) = self.pairs.get(&pair_key(a, b)) {
            return Err(ValidationError::AlreadyTethered { a, b, existing }.into());
        }
        for (node, data) in [(a, a_data), (b, b_data)] {
            if let Some(limit) = self.type_def(data).and_then(|d| d.max_adjacency)
                && self.adjacency_count(node) >= limit as usize
            {
                return Err(ValidationError::AdjacencyLimit { node, limit }.into());
            }
        }

        let id = self.tethers.insert(TetherData {
            origin: a,
            target: b,
        });
        self.pairs.insert(pair_key(a, b), id);
        for node in [a, b] {
            if let Some(adj) = self.adjacency.get_mut(node) {
                adj.push(id);
            }
        }
        debug!(tether = ?id, origin = ?a, target = ?b, "tether created");
        Ok(id)
    }

    /// Remove a tether, freeing one adjacency on each endpoint.
    pub fn remove_tether(&mut self, id: TetherId) -> Result<TetherData, GraphError> {
        let data = self
            .tethers
            .remove(id)
            .ok_or(GraphError::TetherNotFound(id))?;
        self.pairs.remove(&pair_key(data.origin, data.target));
        for node in [data.origin, data.target] {
            if let Some(adj) = self.adjacency.get_mut(node) {
                adj.retain(|&t| t != id);
            }
        }
        debug!(tether = ?id, "tether removed");
        Ok(data)
    }

    /// Remove a node and every tether incident to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedNode, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        let incident = self.adjacency.get(id).cloned().unwrap_or_default();
        for &tether in &incident {
            self.remove_tether(tether)?;
        }
        self.adjacency.remove(id);
        let data = self.nodes.remove(id).ok_or(GraphError::NodeNotFound(id))?;
        debug!(node = ?id, tethers = incident.len(), "node removed");
        Ok(RemovedNode {
            id,
            data,
            tethers: incident,
        })
    }

    /// Change which side a node fights for. Returns the previous allegiance.
    pub fn set_allegiance(
        &mut self,
        id: NodeId,
        allegiance: Allegiance,
    ) -> Result<Allegiance, GraphError> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.allegiance, allegiance))
    }

    /// Move a node. Connectivity is unaffected.
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        node.position = position;
        Ok(())
    }

    /// Drop every node and tether. Ids handed out before the call are stale
    /// afterwards.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.tethers.clear();
        self.adjacency.clear();
        self.pairs.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn get_tether(&self, id: TetherId) -> Option<&TetherData> {
        self.tethers.get(id)
    }

    /// The registry definition for a live node.
    pub fn node_type_def(&self, id: NodeId) -> Option<&NodeTypeDef> {
        self.nodes.get(id).and_then(|data| self.type_def(data))
    }

    fn type_def(&self, data: &NodeData) -> Option<&NodeTypeDef> {
        self.registry.get_node_type(data.node_type)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_tether(&self, id: TetherId) -> bool {
        self.tethers.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn tether_count(&self) -> usize {
        self.tethers.len()
    }

    /// Iterate over all node IDs and their data, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Iterate over all tether IDs and their data, in arena order.
    pub fn tethers(&self) -> impl Iterator<Item = (TetherId, &TetherData)> {
        self.tethers.iter()
    }

    /// Ids of every hub-kind node.
    pub fn hubs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, data)| data.kind == NodeKind::Hub)
            .map(|(id, _)| id)
    }

    /// Currency produced per logic tick by economy nodes of `allegiance`.
    pub fn income(&self, allegiance: Allegiance) -> Fixed64 {
        self.nodes
            .values()
            .filter(|data| data.allegiance == allegiance && data.kind == NodeKind::Economy)
            .filter_map(|data| self.type_def(data))
            .fold(Fixed64::ZERO, |acc, def| acc + def.income)
    }

    /// Tethers incident to a node. Empty for unknown nodes.
    pub fn tethers_of(&self, id: NodeId) -> &[TetherId] {
        self.adjacency
            .get(id)
            .map(|adj| adj.as_slice())
            .unwrap_or(&[])
    }

    /// Number of tethers incident to a node.
    pub fn adjacency_count(&self, id: NodeId) -> usize {
        self.tethers_of(id).len()
    }

    /// Whether `id` could accept one more tether without hitting its cap.
    pub fn has_free_adjacency(&self, id: NodeId) -> Result<bool, GraphError> {
        let data = self.nodes.get(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(match self.type_def(data).and_then(|d| d.max_adjacency) {
            Some(limit) => self.adjacency_count(id) < limit as usize,
            None => true,
        })
    }

    /// Every node tethered to `id`, on either side of the tether.
    pub fn neighbors(&self, id: NodeId) -> Result<BTreeSet<NodeId>, GraphError> {
        let adj = self.adjacency.get(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(adj
            .iter()
            .filter_map(|&t| self.tethers.get(t).and_then(|data| data.other(id)))
            .collect())
    }

    /// The tether linking `a` and `b`, regardless of argument order.
    pub fn is_neighbor(&self, a: NodeId, b: NodeId) -> Option<TetherId> {
        self.pairs.get(&pair_key(a, b)).copied()
    }

    /// Breadth-first hop counts from `source`. Unreachable nodes are absent.
    pub fn shortest_distances(
        &self,
        source: NodeId,
    ) -> Result<SecondaryMap<NodeId, u32>, GraphError> {
        if !self.nodes.contains_key(source) {
            return Err(GraphError::NodeNotFound(source));
        }
        Ok(self.bfs([source]))
    }

    /// Minimum hop count from any hub to every reachable node.
    ///
    /// A multi-source BFS seeded with every hub at distance 0 yields, for each
    /// node, the minimum over the per-hub distances.
    pub fn hub_distances(&self) -> SecondaryMap<NodeId, u32> {
        self.bfs(self.hubs().collect::<Vec<_>>())
    }

    fn bfs(&self, sources: impl IntoIterator<Item = NodeId>) -> SecondaryMap<NodeId, u32> {
        let mut dist: SecondaryMap<NodeId, u32> = SecondaryMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for source in sources {
            if dist.insert(source, 0).is_none() {
                queue.push_back(source);
            }
        }

        while let Some(node) = queue.pop_front() {
            let next = dist.get(node).copied().unwrap_or(0) + 1;
            for &tether in self.tethers_of(node) {
                let Some(other) = self.tethers.get(tether).and_then(|t| t.other(node)) else {
                    continue;
                };
                if !dist.contains_key(other) {
                    dist.insert(other, next);
                    queue.push_back(other);
                }
            }
        }
        dist
    }

    /// Check hub connectivity, listing every offending node.
    pub fn layout_report(&self, max_distance: u32) -> LayoutReport {
        let distances = self.hub_distances();
        let mut report = LayoutReport::default();
        for (id, _) in &self.nodes {
            match distances.get(id) {
                None => report.unreachable.push(id),
                Some(&d) if d > max_distance => report.too_far.push((id, d)),
                Some(_) => {}
            }
        }
        report
    }

    /// True iff every node is reachable from some hub within `max_distance`
    /// hops. This is the contract a layout must meet before it is saved.
    pub fn validate_layout(&self, max_distance: u32) -> bool {
        self.layout_report(max_distance).is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Helper: a graph with `count` friendly base nodes.
    fn make_graph_with_nodes(count: usize) -> (EntityGraph, Vec<NodeId>) {
        let mut graph = EntityGraph::new(standard_registry());
        let nodes = (0..count)
            .map(|i| {
                graph
                    .create_node(base_type(), Position::new(i as f64, 0.0, 0.0))
                    .unwrap()
            })
            .collect();
        (graph, nodes)
    }

    #[test]
    fn create_and_remove_nodes() {
        let (mut graph, nodes) = make_graph_with_nodes(3);
        assert_eq!(graph.node_count(), 3);

        let removed = graph.remove_node(nodes[1]).unwrap();
        assert_eq!(removed.data.node_type, base_type());
        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains_node(nodes[0]));
        assert!(!graph.contains_node(nodes[1]));
        assert!(graph.contains_node(nodes[2]));
    }

    #[test]
    fn unknown_type_rejected_without_insert() {
        let mut graph = EntityGraph::new(standard_registry());
        let err = graph
            .create_node(NodeTypeId(999), Position::ORIGIN)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::Validation(ValidationError::UnknownNodeType(NodeTypeId(999)))
        );
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn removed_ids_are_not_reused_while_stale() {
        let (mut graph, nodes) = make_graph_with_nodes(1);
        graph.remove_node(nodes[0]).unwrap();
        let fresh = graph.create_node(base_type(), Position::ORIGIN).unwrap();
        assert_ne!(fresh, nodes[0]);
        assert!(graph.get_node(nodes[0]).is_none());
    }

    #[test]
    fn tether_links_both_directions() {
        let (mut graph, nodes) = make_graph_with_nodes(2);
        let t = graph.tether(nodes[0], nodes[1]).unwrap();

        assert_eq!(graph.tether_count(), 1);
        assert_eq!(graph.is_neighbor(nodes[0], nodes[1]), Some(t));
        assert_eq!(graph.is_neighbor(nodes[1], nodes[0]), Some(t));
        assert_eq!(graph.adjacency_count(nodes[0]), 1);
        assert_eq!(graph.adjacency_count(nodes[1]), 1);

        let data = graph.get_tether(t).unwrap();
        assert_eq!(data.origin, nodes[0]);
        assert_eq!(data.other(nodes[0]), Some(nodes[1]));
    }

    #[test]
    fn duplicate_tether_rejected_either_order() {
        let (mut graph, nodes) = make_graph_with_nodes(2);
        let t = graph.tether(nodes[0], nodes[1]).unwrap();

        for (a, b) in [(nodes[0], nodes[1]), (nodes[1], nodes[0])] {
            let err = graph.tether(a, b).unwrap_err();
            assert_eq!(
                err,
                GraphError::Validation(ValidationError::AlreadyTethered { a, b, existing: t })
            );
        }
        assert_eq!(graph.tether_count(), 1);
        assert_eq!(graph.adjacency_count(nodes[0]), 1);
    }

    #[test]
    fn self_tether_rejected() {
        let (mut graph, nodes) = make_graph_with_nodes(1);
        let err = graph.tether(nodes[0], nodes[0]).unwrap_err();
        assert_eq!(
            err,
            GraphError::Validation(ValidationError::SelfTether(nodes[0]))
        );
        assert_eq!(graph.adjacency_count(nodes[0]), 0);
    }

    #[test]
    fn adjacency_limit_enforced() {
        let mut graph = EntityGraph::new(standard_registry());
        // Mines accept at most two tethers.
        let mine = graph.create_node(mine_type(), Position::ORIGIN).unwrap();
        let others: Vec<NodeId> = (0..3)
            .map(|_| graph.create_node(base_type(), Position::ORIGIN).unwrap())
            .collect();

        graph.tether(mine, others[0]).unwrap();
        graph.tether(others[1], mine).unwrap();
        assert!(!graph.has_free_adjacency(mine).unwrap());

        let err = graph.tether(mine, others[2]).unwrap_err();
        assert_eq!(
            err,
            GraphError::Validation(ValidationError::AdjacencyLimit {
                node: mine,
                limit: 2
            })
        );
        assert_eq!(graph.tether_count(), 2);
        assert_eq!(graph.adjacency_count(others[2]), 0);
    }

    #[test]
    fn tether_to_unknown_node_is_not_found() {
        let (mut graph, nodes) = make_graph_with_nodes(2);
        graph.remove_node(nodes[1]).unwrap();
        let err = graph.tether(nodes[0], nodes[1]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_tether_frees_adjacency() {
        let (mut graph, nodes) = make_graph_with_nodes(2);
        let t = graph.tether(nodes[0], nodes[1]).unwrap();
        graph.remove_tether(t).unwrap();

        assert_eq!(graph.tether_count(), 0);
        assert!(graph.is_neighbor(nodes[0], nodes[1]).is_none());
        assert_eq!(graph.adjacency_count(nodes[0]), 0);
        // The pair can be linked again.
        graph.tether(nodes[1], nodes[0]).unwrap();

        assert_eq!(
            graph.remove_tether(t).unwrap_err(),
            GraphError::TetherNotFound(t)
        );
    }

    #[test]
    fn remove_node_cascades_tethers() {
        let (mut graph, nodes) = make_graph_with_nodes(3);
        let [a, b, c] = [nodes[0], nodes[1], nodes[2]];
        graph.tether(a, b).unwrap();
        graph.tether(b, c).unwrap();

        let removed = graph.remove_node(b).unwrap();
        assert_eq!(removed.tethers.len(), 2);
        assert_eq!(graph.tether_count(), 0);
        assert_eq!(graph.adjacency_count(a), 0);
        assert_eq!(graph.adjacency_count(c), 0);
        assert!(graph.neighbors(a).unwrap().is_empty());
    }

    #[test]
    fn remove_unknown_node_fails() {
        let (mut graph, nodes) = make_graph_with_nodes(1);
        graph.remove_node(nodes[0]).unwrap();
        assert_eq!(
            graph.remove_node(nodes[0]).unwrap_err(),
            GraphError::NodeNotFound(nodes[0])
        );
    }

    #[test]
    fn neighbors_include_both_sides() {
        let (mut graph, nodes) = make_graph_with_nodes(4);
        let [a, b, c, d] = [nodes[0], nodes[1], nodes[2], nodes[3]];
        graph.tether(a, b).unwrap();
        graph.tether(c, a).unwrap();
        graph.tether(c, d).unwrap();

        let n = graph.neighbors(a).unwrap();
        assert_eq!(n.len(), 2);
        assert!(n.contains(&b) && n.contains(&c));
        assert!(graph.neighbors(d).unwrap().contains(&c));
    }

    #[test]
    fn shortest_distances_bfs() {
        let (mut graph, nodes) = make_graph_with_nodes(5);
        let [a, b, c, d, e] = [nodes[0], nodes[1], nodes[2], nodes[3], nodes[4]];
        // a - b - c - d, plus a shortcut a - d. e is isolated.
        graph.tether(a, b).unwrap();
        graph.tether(b, c).unwrap();
        graph.tether(c, d).unwrap();
        graph.tether(a, d).unwrap();

        let dist = graph.shortest_distances(a).unwrap();
        assert_eq!(dist.get(a), Some(&0));
        assert_eq!(dist.get(b), Some(&1));
        assert_eq!(dist.get(d), Some(&1));
        assert_eq!(dist.get(c), Some(&2));
        assert!(dist.get(e).is_none());
    }

    #[test]
    fn validate_layout_connected_within_range() {
        let mut graph = EntityGraph::new(standard_registry());
        let hub = graph.create_node(hub_type(), Position::ORIGIN).unwrap();
        let a = graph.create_node(base_type(), Position::ORIGIN).unwrap();
        let b = graph.create_node(base_type(), Position::ORIGIN).unwrap();
        graph.tether(hub, a).unwrap();
        graph.tether(a, b).unwrap();

        assert!(graph.validate_layout(2));
        assert!(!graph.validate_layout(1));

        let report = graph.layout_report(1);
        assert_eq!(report.too_far, vec![(b, 2)]);
        assert!(report.unreachable.is_empty());
    }

    #[test]
    fn validate_layout_rejects_unreachable() {
        let mut graph = EntityGraph::new(standard_registry());
        let hub = graph.create_node(hub_type(), Position::ORIGIN).unwrap();
        let a = graph.create_node(base_type(), Position::ORIGIN).unwrap();
        let island = graph.create_node(base_type(), Position::ORIGIN).unwrap();
        graph.tether(hub, a).unwrap();

        assert!(!graph.validate_layout(10));
        assert_eq!(graph.layout_report(10).unreachable, vec![island]);
    }

    #[test]
    fn validate_layout_takes_nearest_hub() {
        let mut graph = EntityGraph::new(standard_registry());
        let hub1 = graph.create_node(hub_type(), Position::ORIGIN).unwrap();
        let hub2 = graph.create_node(hub_type(), Position::ORIGIN).unwrap();
        let chain: Vec<NodeId> = (0..4)
            .map(|_| graph.create_node(base_type(), Position::ORIGIN).unwrap())
            .collect();
        graph.tether(hub1, chain[0]).unwrap();
        for w in chain.windows(2) {
            graph.tether(w[0], w[1]).unwrap();
        }
        // chain[3] is 4 hops from hub1 but 1 hop from hub2.
        graph.tether(hub2, chain[3]).unwrap();

        assert!(graph.validate_layout(2));
        assert_eq!(graph.hub_distances().get(chain[2]), Some(&2));
    }

    #[test]
    fn validate_layout_without_hubs_fails_for_nonempty_graph() {
        let (graph, _) = make_graph_with_nodes(1);
        assert!(!graph.validate_layout(100));
        let empty = EntityGraph::new(standard_registry());
        assert!(empty.validate_layout(0));
    }

    #[test]
    fn set_allegiance_returns_previous() {
        let (mut graph, nodes) = make_graph_with_nodes(1);
        let prev = graph.set_allegiance(nodes[0], Allegiance::Enemy).unwrap();
        assert_eq!(prev, Allegiance::Friendly);
        assert_eq!(graph.get_node(nodes[0]).unwrap().allegiance, Allegiance::Enemy);
    }

    #[test]
    fn clear_empties_everything() {
        let (mut graph, nodes) = make_graph_with_nodes(3);
        graph.tether(nodes[0], nodes[1]).unwrap();
        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.tether_count(), 0);
        assert!(graph.is_neighbor(nodes[0], nodes[1]).is_none());
        assert!(graph.neighbors(nodes[0]).is_err());
    }

    #[test]
    fn income_counts_only_economy_nodes_of_a_side() {
        let mut graph = EntityGraph::new(standard_registry());
        graph.create_node(mine_type(), Position::ORIGIN).unwrap();
        graph.create_node(mine_type(), Position::ORIGIN).unwrap();
        graph.create_node(base_type(), Position::ORIGIN).unwrap();
        graph
            .create_node_as(mine_type(), Position::ORIGIN, Allegiance::Enemy)
            .unwrap();
        assert_eq!(graph.income(Allegiance::Friendly), fixed(2.0));
        assert_eq!(graph.income(Allegiance::Enemy), fixed(1.0));
    }
}

//! Persisted layout format.
//!
//! A layout is the JSON document the layout store exchanges:
//!
//! ```json
//! { "background": "nebula",
//!   "layout": {
//!     "nodes": [ { "type": "hub", "uuid": "0", "position": [0, 0, 0] } ],
//!     "neighbors": [ [0, 1] ] } }
//! ```
//!
//! Node references are dense indices into `nodes`, never live ids. The
//! document may travel as plain JSON or base64-wrapped JSON; decoding
//! detects which.

use crate::graph::{EntityGraph, GraphError};
use crate::id::{Allegiance, NodeId, Position};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("neighbor pair [{a}, {b}] references a node outside 0..{count}")]
    BadIndex { a: usize, b: usize, count: usize },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layout base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub uuid: String,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub nodes: Vec<LayoutNode>,
    #[serde(default)]
    pub neighbors: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedLayout {
    #[serde(default)]
    pub background: String,
    pub layout: LayoutData,
}

/// How a layout is wrapped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutEncoding {
    #[default]
    Json,
    Base64Json,
}

impl SavedLayout {
    pub fn node_count(&self) -> usize {
        self.layout.nodes.len()
    }

    pub fn tether_count(&self) -> usize {
        self.layout.neighbors.len()
    }

    /// Serialize `graph` with dense indices in arena order.
    pub fn from_graph(graph: &EntityGraph, background: &str) -> Self {
        let registry = graph.registry();
        let mut index_of: SecondaryMap<NodeId, usize> = SecondaryMap::new();
        let mut nodes = Vec::with_capacity(graph.node_count());
        for (id, data) in graph.nodes() {
            let node_type = registry
                .get_node_type(data.node_type)
                .map(|def| def.name.clone())
                .unwrap_or_default();
            index_of.insert(id, nodes.len());
            nodes.push(LayoutNode {
                node_type,
                uuid: nodes.len().to_string(),
                position: data.position.0,
            });
        }
        let neighbors = graph
            .tethers()
            .filter_map(|(_, t)| Some([*index_of.get(t.origin)?, *index_of.get(t.target)?]))
            .collect();
        Self {
            background: background.to_string(),
            layout: LayoutData { nodes, neighbors },
        }
    }

    /// Add this layout's nodes and tethers to `graph`, all fighting for
    /// `allegiance`. Returns the created ids in layout order.
    ///
    /// All or nothing: on error `graph` is unchanged.
    pub fn load_into(
        &self,
        graph: &mut EntityGraph,
        allegiance: Allegiance,
    ) -> Result<Vec<NodeId>, LayoutError> {
        let mut staged = graph.clone();
        let ids = self.build(&mut staged, allegiance)?;
        *graph = staged;
        debug!(
            nodes = ids.len(),
            tethers = self.layout.neighbors.len(),
            ?allegiance,
            "layout loaded"
        );
        Ok(ids)
    }

    fn build(
        &self,
        graph: &mut EntityGraph,
        allegiance: Allegiance,
    ) -> Result<Vec<NodeId>, LayoutError> {
        let registry = graph.registry().clone();
        let mut ids = Vec::with_capacity(self.layout.nodes.len());
        for node in &self.layout.nodes {
            let node_type = registry
                .node_type_id(&node.node_type)
                .ok_or_else(|| LayoutError::UnknownNodeType(node.node_type.clone()))?;
            ids.push(graph.create_node_as(node_type, Position(node.position), allegiance)?);
        }
        for &[a, b] in &self.layout.neighbors {
            let (Some(&id_a), Some(&id_b)) = (ids.get(a), ids.get(b)) else {
                return Err(LayoutError::BadIndex {
                    a,
                    b,
                    count: ids.len(),
                });
            };
            graph.tether(id_a, id_b)?;
        }
        Ok(ids)
    }

    pub fn encode(&self, encoding: LayoutEncoding) -> Result<String, LayoutError> {
        let json = serde_json::to_string(self)?;
        Ok(match encoding {
            LayoutEncoding::Json => json,
            LayoutEncoding::Base64Json => BASE64.encode(json),
        })
    }

    /// Parse either plain or base64-wrapped JSON.
    pub fn decode(text: &str) -> Result<Self, LayoutError> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            return Ok(serde_json::from_str(trimmed)?);
        }
        let bytes = BASE64.decode(trimmed).inspect_err(|err| {
            warn!(%err, "layout is neither JSON nor base64");
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

//! Export the synchronization structure of a graph in graphviz `dot` format.
//!
//! Every enabled pass becomes a node, and every planned barrier between two passes becomes an edge labeled with the
//! resource it protects and the layout transition it performs. First-touch barriers have no source pass in the same
//! frame and are drawn as edges from a single `previous frame` node.

use std::fmt::{Display, Formatter};

use anyhow::Result;
use petgraph::dot::Dot;
use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::Graph;

use crate::graph::hazard::{BarrierPlan, BarrierSource};
use crate::graph::pass::{Pass, PassKind};
use crate::graph::registry::ResourceRegistry;

/// Node of a [`DependencyGraph`].
#[derive(Debug, Clone)]
pub enum DependencyNode {
    /// An enabled pass
    Pass {
        /// Pass name
        name: String,
        /// Pass kind
        kind: PassKind,
    },
    /// Stands in for whatever the previous frame left behind.
    PreviousFrame,
}

impl Display for DependencyNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyNode::Pass {
                name,
                ..
            } => write!(f, "{name}"),
            DependencyNode::PreviousFrame => write!(f, "previous frame"),
        }
    }
}

/// Edge of a [`DependencyGraph`]: one barrier.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    /// Name of the protected resource
    pub resource: String,
    /// Whether the barrier changes the image layout
    pub transition: bool,
}

impl Display for DependencyEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resource)
    }
}

/// Used to export a graph to a graphviz `dot` string.
pub trait GraphViz {
    /// Get the string representation of this graph in `dot` format.
    fn dot(&self) -> Result<String>;
}

/// Dependency graph between the enabled passes of one barrier plan.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: Graph<DependencyNode, DependencyEdge>,
}

impl DependencyGraph {
    /// Build the dependency graph of a barrier plan.
    pub fn new(registry: &ResourceRegistry, passes: &[Pass], plan: &BarrierPlan) -> Self {
        let mut graph = Graph::new();
        let mut nodes: Vec<Option<NodeIndex>> = vec![None; passes.len()];
        for (index, pass) in passes.iter().enumerate() {
            if plan.topology().get(index).copied().unwrap_or(false) {
                nodes[index] = Some(graph.add_node(DependencyNode::Pass {
                    name: pass.name().to_owned(),
                    kind: pass.kind(),
                }));
            }
        }

        let mut previous_frame = None;
        for (pass, barrier) in plan.iter() {
            let Some(dst) = nodes.get(pass.index()).copied().flatten() else {
                continue;
            };
            let (src, transition) = match barrier.src {
                BarrierSource::Touch {
                    pass: src,
                    state,
                } => match nodes.get(src.index()).copied().flatten() {
                    Some(node) => (node, state.layout != barrier.dst.layout),
                    None => continue,
                },
                BarrierSource::LastObserved => {
                    let node = *previous_frame.get_or_insert_with(|| graph.add_node(DependencyNode::PreviousFrame));
                    (node, true)
                }
            };
            let resource = registry
                .get(barrier.resource)
                .map(|resource| resource.name().to_owned())
                .unwrap_or_else(|_| format!("#{}", barrier.resource.index()));
            graph.add_edge(
                src,
                dst,
                DependencyEdge {
                    resource,
                    transition,
                },
            );
        }

        Self {
            graph,
        }
    }

    /// Number of nodes, including the previous frame node if present.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of barrier edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The underlying petgraph graph.
    pub fn graph(&self) -> &Graph<DependencyNode, DependencyEdge> {
        &self.graph
    }

    fn edge_attributes(_: &Graph<DependencyNode, DependencyEdge>, edge: EdgeReference<DependencyEdge>) -> String {
        if edge.weight().transition {
            String::from("color = \"#f75e70\"")
        } else {
            String::from("style = dashed")
        }
    }

    fn node_attributes(_: &Graph<DependencyNode, DependencyEdge>, node: (NodeIndex, &DependencyNode)) -> String {
        match node.1 {
            DependencyNode::Pass {
                kind: PassKind::Graphics,
                ..
            } => String::from("fillcolor = \"#5e6df7\""),
            DependencyNode::Pass {
                kind: PassKind::Compute,
                ..
            } => String::from("fillcolor = \"#5ef78a\""),
            DependencyNode::PreviousFrame => String::from("shape = box"),
        }
    }
}

impl GraphViz for DependencyGraph {
    fn dot(&self) -> Result<String> {
        Ok(format!(
            "{}",
            Dot::with_attr_getters(&self.graph, &[], &Self::edge_attributes, &Self::node_attributes)
        ))
    }
}

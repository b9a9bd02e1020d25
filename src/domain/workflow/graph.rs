//! Arena view over a workflow's nodes and edges
//!
//! Nodes are addressed by their index in declaration order and edges are kept
//! per source node in declaration order, so "first outgoing edge" is well
//! defined. Traversals carry an explicit visited set, which makes cycles
//! harmless.

use std::collections::{HashMap, HashSet};

use super::entity::{ActionNode, Edge, Workflow};
use super::node_types::NodeKind;

/// Index of a node within the workflow's node list
pub type NodeIndex = usize;

#[derive(Debug)]
pub struct WorkflowGraph<'w> {
    nodes: &'w [ActionNode],
    index: HashMap<&'w str, NodeIndex>,
    outgoing: Vec<Vec<&'w Edge>>,
}

impl<'w> WorkflowGraph<'w> {
    /// Build the graph; edges whose endpoints do not exist are ignored.
    /// Duplicate node ids resolve to the first declaration.
    pub fn new(workflow: &'w Workflow) -> Self {
        let nodes = workflow.nodes();
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id()).or_insert(i);
        }

        let mut outgoing = vec![Vec::new(); nodes.len()];
        for edge in workflow.edges() {
            if let (Some(&source), true) = (
                index.get(edge.source.as_str()),
                index.contains_key(edge.target.as_str()),
            ) {
                outgoing[source].push(edge);
            }
        }

        Self {
            nodes,
            index,
            outgoing,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> &'w ActionNode {
        &self.nodes[index]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// The entry node; the first trigger if several were declared
    pub fn trigger(&self) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.is_trigger())
    }

    pub fn outgoing(&self, index: NodeIndex) -> &[&'w Edge] {
        &self.outgoing[index]
    }

    /// Target of the first outgoing edge
    pub fn next_linear(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.outgoing[index]
            .first()
            .and_then(|edge| self.index_of(&edge.target))
    }

    /// Target of the first outgoing edge carrying `label`
    pub fn next_for_branch(&self, index: NodeIndex, label: &str) -> Option<NodeIndex> {
        self.outgoing[index]
            .iter()
            .find(|edge| edge.branch_label.as_deref() == Some(label))
            .and_then(|edge| self.index_of(&edge.target))
    }

    /// Static first-edge walk from `start`, stopping at a dead end or at the
    /// first node already in `visited`. Condition nodes end the walk since
    /// their successor depends on run-time data.
    pub fn linear_walk(&self, start: NodeIndex, visited: &HashSet<NodeIndex>) -> Vec<NodeIndex> {
        let mut seen = visited.clone();
        let mut walk = Vec::new();
        let mut cursor = Some(start);

        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            walk.push(current);
            cursor = match self.node(current).kind() {
                NodeKind::Condition(_) => None,
                _ => self.next_linear(current),
            };
        }

        walk
    }

    /// Every node reachable from `start` over any edge, excluding `start`
    pub fn reachable_from(&self, start: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = self.reach(start);
        seen.remove(&start);
        seen
    }

    /// Nodes reachable in one or more steps; contains `start` only on a cycle
    fn reach(&self, start: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeIndex> = self.successors(start).collect();

        while let Some(current) = stack.pop() {
            if seen.insert(current) {
                stack.extend(self.successors(current));
            }
        }

        seen
    }

    fn successors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.outgoing[index]
            .iter()
            .filter_map(|edge| self.index_of(&edge.target))
    }

    /// Nodes the traversal never reached, in declaration order.
    ///
    /// Triggers and nodes hanging off a branch of a condition that was
    /// visited are excluded, so untaken branches stay untaken.
    pub fn disconnected_tail(&self, visited: &HashSet<NodeIndex>) -> Vec<NodeIndex> {
        let mut on_branches = HashSet::new();
        for &index in visited {
            if matches!(self.node(index).kind(), NodeKind::Condition(_)) {
                on_branches.extend(self.reachable_from(index));
            }
        }

        (0..self.nodes.len())
            .filter(|i| !visited.contains(i))
            .filter(|i| !on_branches.contains(i))
            .filter(|&i| !self.node(i).is_trigger())
            .collect()
    }

    /// True when some node can reach itself
    pub fn has_cycle(&self) -> bool {
        (0..self.nodes.len()).any(|i| self.reach(i).contains(&i))
    }

    /// Nodes that no path from the trigger reaches, triggers excluded
    pub fn unreachable(&self) -> Vec<NodeIndex> {
        let reachable = self
            .trigger()
            .map(|t| self.reachable_from(t))
            .unwrap_or_default();

        (0..self.nodes.len())
            .filter(|i| !reachable.contains(i) && !self.node(*i).is_trigger())
            .collect()
    }
}

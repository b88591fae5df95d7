//! Structural workflow validation. Run this before persisting or executing a
//! workflow; the executor itself does not.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the workflow.
//! 2. Every edge must reference valid node IDs (both `source` and `target`).
//! 3. Exactly one start node and at least one end node.
//! 4. Every end node must be reachable from the start node.
//! 5. Every built-in node's data must parse and validate for its type.
//! 6. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns a topologically-sorted list of node IDs on success.

use std::collections::{HashMap, HashSet, VecDeque};

use nodes::{NodeData, NodeError, NodeKind};

use crate::{models::Workflow, EngineError};

/// Validate the workflow's structure and return nodes in topological order.
///
/// Node types outside the built-in set are allowed; their data is left to
/// whichever handler is registered for them.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::StartNodeCount`] / [`EngineError::NoEndNode`] for a
///   wrong number of start or end nodes.
/// - [`EngineError::UnreachableEndNode`] if an end node can't be reached.
/// - [`EngineError::InvalidNodeData`] if a node's payload is malformed.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_workflow(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate edge endpoints
    // -----------------------------------------------------------------------
    for edge in &workflow.edges {
        if !seen_ids.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !seen_ids.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.target.clone(),
                side: "target",
            });
        }
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &workflow.nodes {
        adjacency.entry(node.id.as_str()).or_default();
    }
    for edge in &workflow.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    // -----------------------------------------------------------------------
    // 3. Start / end node counts
    // -----------------------------------------------------------------------
    let of_kind = |kind: NodeKind| {
        workflow
            .nodes
            .iter()
            .filter(move |n| n.node_type == kind.as_str())
    };

    let starts: Vec<_> = of_kind(NodeKind::Start).collect();
    let start = match starts.as_slice() {
        [only] => *only,
        other => return Err(EngineError::StartNodeCount(other.len())),
    };

    let ends: Vec<_> = of_kind(NodeKind::End).collect();
    if ends.is_empty() {
        return Err(EngineError::NoEndNode);
    }

    // -----------------------------------------------------------------------
    // 4. Reachability (BFS from start)
    // -----------------------------------------------------------------------
    let mut reachable: HashSet<&str> = HashSet::from([start.id.as_str()]);
    let mut frontier: VecDeque<&str> = VecDeque::from([start.id.as_str()]);
    while let Some(node_id) = frontier.pop_front() {
        for &next in adjacency.get(node_id).map(Vec::as_slice).unwrap_or_default() {
            if reachable.insert(next) {
                frontier.push_back(next);
            }
        }
    }
    if let Some(end) = ends.iter().find(|n| !reachable.contains(n.id.as_str())) {
        return Err(EngineError::UnreachableEndNode(end.id.clone()));
    }

    // -----------------------------------------------------------------------
    // 5. Node data
    // -----------------------------------------------------------------------
    for node in &workflow.nodes {
        match NodeData::parse(&node.node_type, &node.data) {
            Ok(_) | Err(NodeError::UnknownNodeType(_)) => {}
            Err(source) => {
                return Err(EngineError::InvalidNodeData {
                    node_id: node.id.clone(),
                    source,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // 6. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    let mut in_degree: HashMap<&str, usize> =
        workflow.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for edge in &workflow.edges {
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    // Seed in declaration order so the result is stable.
    let mut queue: VecDeque<&str> = workflow
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree[id] == 0)
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != workflow.nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}

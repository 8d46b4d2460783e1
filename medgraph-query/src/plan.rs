// Copyright 2025 Medgraph (https://github.com/medgraph)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plan translation: TRAPI query graph -> ordered execution edges.
//!
//! Validation beyond ingestion: every node must be reachable, the graph
//! must be acyclic, and at least one node must pin concrete curies.
//! Direction: the input side is the side with concrete curies; when both
//! sides have them, the side with fewer wins. Edges are ordered by frontier
//! expansion from the fixed nodes, ties broken by edge identifier.

use crate::xedge::QXEdge;
use medgraph_core::{MedgraphError, QueryGraph, Result, TrapiQueryGraph};
use std::collections::HashMap;
use tracing::debug;

pub fn translate(trapi: &TrapiQueryGraph) -> Result<(QueryGraph, Vec<QXEdge>)> {
    let mut graph = QueryGraph::from_trapi(trapi)?;

    validate_topology(&graph)?;

    if !graph.nodes().iter().any(|n| n.is_fixed()) {
        return Err(MedgraphError::InvalidQueryGraph(
            "at least one node must declare concrete identifiers".into(),
        ));
    }

    widen_categories(&mut graph);

    let xedges = order_edges(&graph);
    debug!(
        edges = xedges.len(),
        plan = ?xedges.iter().map(|x| (&x.id, x.reverse)).collect::<Vec<_>>(),
        "translated query graph"
    );
    Ok((graph, xedges))
}

/// Every node must appear in some edge, the graph must be connected, and
/// joining two already-connected nodes means a cycle.
fn validate_topology(graph: &QueryGraph) -> Result<()> {
    let mut parent: Vec<usize> = (0..graph.nodes().len()).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for edge in graph.edges() {
        let a = find(&mut parent, edge.subject);
        let b = find(&mut parent, edge.object);
        if a == b {
            return Err(MedgraphError::InvalidQueryGraph(format!(
                "cycle detected involving edge {}",
                edge.id
            )));
        }
        parent[a] = b;
    }

    let root = find(&mut parent, 0);
    for (idx, node) in graph.nodes().iter().enumerate() {
        if find(&mut parent, idx) != root {
            return Err(MedgraphError::InvalidQueryGraph(format!(
                "node {} is not connected to the rest of the query graph",
                node.id
            )));
        }
        if graph.edges_at(idx).is_empty() {
            return Err(MedgraphError::InvalidQueryGraph(format!(
                "node {} is not referenced by any edge",
                node.id
            )));
        }
    }
    Ok(())
}

/// A node declared `Protein` without `Gene` gains `Gene`, so gene-level
/// operations also cover isoform-level lookups.
fn widen_categories(graph: &mut QueryGraph) {
    for node in graph.nodes_mut() {
        let has_protein = node.categories.iter().any(|c| c == "biolink:Protein");
        let has_gene = node.categories.iter().any(|c| c == "biolink:Gene");
        if has_protein && !has_gene {
            node.categories.push("biolink:Gene".to_string());
        }
    }
}

/// Frontier expansion from the fixed nodes. Each planned edge seeds its
/// endpoints; the next edge is the lexicographically smallest unplanned
/// edge touching a seeded node.
fn order_edges(graph: &QueryGraph) -> Vec<QXEdge> {
    // node index -> xedge index that seeded it (None for fixed inputs)
    let mut seeders: HashMap<usize, Option<usize>> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_fixed())
        .map(|(idx, _)| (idx, None))
        .collect();

    let mut planned = vec![false; graph.edges().len()];
    let mut xedges = Vec::with_capacity(graph.edges().len());

    while xedges.len() < graph.edges().len() {
        let next = graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(idx, e)| {
                !planned[*idx]
                    && (seeders.contains_key(&e.subject) || seeders.contains_key(&e.object))
            })
            .min_by(|(_, a), (_, b)| a.id.cmp(&b.id));
        // Connectivity validation guarantees the frontier never dries up.
        let Some((edge_idx, edge)) = next else { break };

        let reverse = choose_reverse(graph, edge_idx, &seeders);
        let input_node = if reverse { edge.object } else { edge.subject };
        let predecessor = seeders.get(&input_node).copied().flatten();

        let mut xedge = QXEdge::new(edge_idx, edge.id.clone(), reverse, predecessor);
        if graph.node(input_node).is_fixed() {
            xedge.input_curies = graph.node(input_node).curies.iter().cloned().collect();
        }

        planned[edge_idx] = true;
        let xedge_idx = xedges.len();
        seeders.entry(edge.subject).or_insert(Some(xedge_idx));
        seeders.entry(edge.object).or_insert(Some(xedge_idx));
        xedges.push(xedge);
    }

    xedges
}

fn choose_reverse(
    graph: &QueryGraph,
    edge_idx: usize,
    seeders: &HashMap<usize, Option<usize>>,
) -> bool {
    let edge = graph.edge(edge_idx);
    let subject_seeded = seeders.contains_key(&edge.subject);
    let object_seeded = seeders.contains_key(&edge.object);

    match (subject_seeded, object_seeded) {
        (true, false) => false,
        (false, true) => true,
        _ => {
            // Both sides seeded: the side with fewer concrete curies wins;
            // unknown counts lose to known ones, ties keep the declared
            // direction.
            let subject_count = curie_weight(graph, edge.subject);
            let object_count = curie_weight(graph, edge.object);
            object_count < subject_count
        }
    }
}

fn curie_weight(graph: &QueryGraph, node_idx: usize) -> usize {
    let node = graph.node(node_idx);
    if node.is_fixed() {
        node.curies.len()
    } else {
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medgraph_core::trapi::{TrapiQEdge, TrapiQNode};
    use std::collections::BTreeMap;

    fn node(ids: &[&str], categories: &[&str]) -> TrapiQNode {
        TrapiQNode {
            ids: if ids.is_empty() {
                None
            } else {
                Some(ids.iter().map(|s| s.to_string()).collect())
            },
            categories: Some(categories.iter().map(|s| s.to_string()).collect()),
            is_set: None,
        }
    }

    fn edge(subject: &str, object: &str) -> TrapiQEdge {
        TrapiQEdge {
            subject: subject.into(),
            object: object.into(),
            predicates: Some(vec!["biolink:related_to".into()]),
        }
    }

    fn gene_disease_gene() -> TrapiQueryGraph {
        let mut nodes = BTreeMap::new();
        nodes.insert("n1".into(), node(&["NCBIGene:3778"], &["Gene"]));
        nodes.insert("n2".into(), node(&[], &["Disease"]));
        nodes.insert("n3".into(), node(&["NCBIGene:7289"], &["Gene"]));
        let mut edges = BTreeMap::new();
        edges.insert("e01".into(), edge("n1", "n2"));
        edges.insert("e02".into(), edge("n2", "n3"));
        TrapiQueryGraph { nodes, edges }
    }

    #[test]
    fn test_two_hop_plan_directions() {
        let (graph, xedges) = translate(&gene_disease_gene()).unwrap();
        assert_eq!(xedges.len(), 2);
        assert_eq!(xedges[0].id, "e01");
        assert!(!xedges[0].reverse, "e01 starts from the fixed gene");
        assert_eq!(xedges[1].id, "e02");
        assert!(xedges[1].reverse, "e02 executes from its fixed object side");
        assert_eq!(graph.node(xedges[1].input_node(&graph)).id, "n3");
    }

    #[test]
    fn test_fixed_input_curies_seeded() {
        let (_, xedges) = translate(&gene_disease_gene()).unwrap();
        assert!(xedges[0].input_curies.contains("NCBIGene:3778"));
        assert!(xedges[1].input_curies.contains("NCBIGene:7289"));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut qg = gene_disease_gene();
        qg.edges.insert("e03".into(), edge("n3", "n1"));
        let err = translate(&qg).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_disconnected_node_rejected() {
        let mut qg = gene_disease_gene();
        qg.nodes.insert("n4".into(), node(&[], &["Drug"]));
        let err = translate(&qg).unwrap_err();
        assert_eq!(err.error_name(), "InvalidQueryGraph");
    }

    #[test]
    fn test_all_free_nodes_rejected() {
        let mut qg = gene_disease_gene();
        for n in qg.nodes.values_mut() {
            n.ids = None;
        }
        let err = translate(&qg).unwrap_err();
        assert!(err.to_string().contains("concrete identifiers"));
    }

    #[test]
    fn test_protein_gains_gene() {
        let mut qg = gene_disease_gene();
        qg.nodes.insert("n1".into(), node(&["UniProtKB:P00533"], &["Protein"]));
        let (graph, _) = translate(&qg).unwrap();
        let n1 = graph.node_by_id("n1").unwrap();
        assert!(n1.categories.contains(&"biolink:Protein".to_string()));
        assert!(n1.categories.contains(&"biolink:Gene".to_string()));
    }

    #[test]
    fn test_direction_prefers_fewer_curies() {
        let mut qg = gene_disease_gene();
        // n1 has two curies, n3 one; the single edge between fixed nodes
        // should execute from n3.
        qg.nodes.insert(
            "n1".into(),
            node(&["NCBIGene:3778", "NCBIGene:1017"], &["Gene"]),
        );
        qg.edges.clear();
        qg.nodes.remove("n2");
        qg.edges.insert("e01".into(), edge("n1", "n3"));
        let (_, xedges) = translate(&qg).unwrap();
        assert!(xedges[0].reverse);
    }
}

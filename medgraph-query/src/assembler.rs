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

//! Results assembly.
//!
//! Joins the per-edge surviving records into complete TRAPI results:
//! enumerate preresults by depth-first traversal from a root edge, group
//! them under a consolidation key honoring `is_set`, and merge each group
//! positionally into one result with sorted bindings.

use crate::manager::OrganizedEdge;
use medgraph_core::{Binding, QueryGraph, Record, TrapiResult};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Reserved separator between consolidation tokens.
const RESULT_KEY_SEPARATOR: &str = "|";

/// Placeholder until real scoring lands.
const PLACEHOLDER_SCORE: f64 = 1.0;

/// One step of a preresult path, in traversal orientation: `input` is the
/// anchor side the curie was propagated into.
#[derive(Debug, Clone)]
struct PathEntry {
    input_qnode: String,
    output_qnode: String,
    input_curie: String,
    output_curie: String,
    qedge_id: String,
    record_hash: String,
}

/// A complete assignment of records across all edges.
#[derive(Debug, Clone)]
struct Preresult {
    entries: Vec<PathEntry>,
    /// Query-node id -> bound curie for this assignment.
    bindings: BTreeMap<String, String>,
}

pub fn assemble(graph: &QueryGraph, organized: &BTreeMap<String, OrganizedEdge>) -> Vec<TrapiResult> {
    if organized.is_empty() || organized.values().any(|e| e.records.is_empty()) {
        return Vec::new();
    }

    let root = select_root(graph, organized);
    let preresults = enumerate(graph, organized, &root);
    debug!(
        preresults = preresults.len(),
        root = %root,
        "enumerated preresults"
    );

    consolidate(graph, preresults)
}

/// Root edge: one with a fixed endpoint, or an endpoint appearing on no
/// other edge; ties resolve by edge identifier.
fn select_root(graph: &QueryGraph, organized: &BTreeMap<String, OrganizedEdge>) -> String {
    let mut occurrence: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in organized.values() {
        *occurrence.entry(edge.input_qnode.as_str()).or_default() += 1;
        *occurrence.entry(edge.output_qnode.as_str()).or_default() += 1;
    }

    let is_root_candidate = |edge: &OrganizedEdge| {
        [&edge.input_qnode, &edge.output_qnode].into_iter().any(|q| {
            graph.node_by_id(q).map(|n| n.is_fixed()).unwrap_or(false)
                || occurrence.get(q.as_str()).copied() == Some(1)
        })
    };

    organized
        .values()
        .filter(|e| is_root_candidate(e))
        .map(|e| e.qedge_id.clone())
        .next()
        // BTreeMap iteration is id-ordered, so the first candidate is the
        // lexicographic tie-break. Fall back to the smallest id outright.
        .unwrap_or_else(|| organized.keys().next().cloned().unwrap_or_default())
}

/// The anchor node the traversal starts from on the root edge: prefer a
/// fixed endpoint, then a unique one, then the input side.
fn root_anchor(graph: &QueryGraph, root: &OrganizedEdge, organized: &BTreeMap<String, OrganizedEdge>) -> String {
    let occurs_once = |q: &str| {
        organized
            .values()
            .filter(|e| e.input_qnode == q || e.output_qnode == q)
            .count()
            == 1
    };
    let fixed = |q: &str| graph.node_by_id(q).map(|n| n.is_fixed()).unwrap_or(false);

    if fixed(&root.input_qnode) {
        root.input_qnode.clone()
    } else if fixed(&root.output_qnode) {
        root.output_qnode.clone()
    } else if occurs_once(&root.input_qnode) {
        root.input_qnode.clone()
    } else if occurs_once(&root.output_qnode) {
        root.output_qnode.clone()
    } else {
        root.input_qnode.clone()
    }
}

fn curie_at<'r>(edge: &OrganizedEdge, record: &'r Record, qnode: &str) -> &'r str {
    if qnode == edge.input_qnode {
        record.subject.curie()
    } else {
        record.object.curie()
    }
}

fn enumerate(
    graph: &QueryGraph,
    organized: &BTreeMap<String, OrganizedEdge>,
    root: &str,
) -> Vec<Preresult> {
    let anchor = root_anchor(graph, &organized[root], organized);
    let mut out = Vec::new();
    let mut visited = BTreeSet::new();
    let mut bindings = BTreeMap::new();
    let mut entries = Vec::new();

    // Seed the anchor so the root edge is picked first with no curie
    // constraint; each record binds it.
    extend(
        organized,
        Some((root.to_string(), anchor)),
        &mut visited,
        &mut bindings,
        &mut entries,
        &mut out,
    );
    out
}

/// Depth-first extension. At each step, pick the next unvisited edge
/// anchored on an already-bound node (the root edge on the first step) and
/// branch over its records consistent with the bindings so far.
fn extend(
    organized: &BTreeMap<String, OrganizedEdge>,
    forced: Option<(String, String)>,
    visited: &mut BTreeSet<String>,
    bindings: &mut BTreeMap<String, String>,
    entries: &mut Vec<PathEntry>,
    out: &mut Vec<Preresult>,
) {
    if entries.len() == organized.len() {
        out.push(Preresult {
            entries: entries.clone(),
            bindings: bindings.clone(),
        });
        return;
    }

    let (edge_id, anchor) = match forced {
        Some(pair) => pair,
        None => {
            // Smallest unvisited edge with a bound endpoint. The traversal
            // skips any edge it has already walked, so cycles never recurse.
            let next = organized.values().find(|e| {
                !visited.contains(&e.qedge_id)
                    && (bindings.contains_key(&e.input_qnode)
                        || bindings.contains_key(&e.output_qnode))
            });
            let Some(edge) = next else { return };
            let anchor = if bindings.contains_key(&edge.input_qnode) {
                edge.input_qnode.clone()
            } else {
                edge.output_qnode.clone()
            };
            (edge.qedge_id.clone(), anchor)
        }
    };

    let edge = &organized[&edge_id];
    let complement = if anchor == edge.input_qnode {
        edge.output_qnode.clone()
    } else {
        edge.input_qnode.clone()
    };
    let anchor_curie = bindings.get(&anchor).cloned();

    visited.insert(edge_id.clone());
    for record in &edge.records {
        let at_anchor = curie_at(edge, record, &anchor);
        if let Some(expected) = &anchor_curie {
            if at_anchor != expected {
                continue;
            }
        }
        let at_complement = curie_at(edge, record, &complement);
        if let Some(bound) = bindings.get(&complement) {
            if bound != at_complement {
                continue;
            }
        }

        entries.push(PathEntry {
            input_qnode: anchor.clone(),
            output_qnode: complement.clone(),
            input_curie: at_anchor.to_string(),
            output_curie: at_complement.to_string(),
            qedge_id: edge_id.clone(),
            record_hash: record.hash.clone(),
        });
        let inserted_anchor = anchor_curie.is_none() && {
            bindings.insert(anchor.clone(), at_anchor.to_string());
            true
        };
        let inserted_complement = !bindings.contains_key(&complement) && {
            bindings.insert(complement.clone(), at_complement.to_string());
            true
        };

        extend(organized, None, visited, bindings, entries, out);

        if inserted_complement {
            bindings.remove(&complement);
        }
        if inserted_anchor {
            bindings.remove(&anchor);
        }
        entries.pop();
    }
    visited.remove(&edge_id);
}

/// Group preresults by consolidation key and merge each group positionally.
fn consolidate(graph: &QueryGraph, preresults: Vec<Preresult>) -> Vec<TrapiResult> {
    let mut groups: BTreeMap<String, Vec<Preresult>> = BTreeMap::new();
    for preresult in preresults {
        groups
            .entry(consolidation_key(graph, &preresult))
            .or_default()
            .push(preresult);
    }

    groups.into_values().map(merge_group).collect()
}

/// Per-node token: the node id alone when the node is `is_set`, otherwise
/// node id plus bound curie. Sorted and joined by the reserved separator.
fn consolidation_key(graph: &QueryGraph, preresult: &Preresult) -> String {
    let mut tokens: Vec<String> = preresult
        .bindings
        .iter()
        .map(|(qnode, curie)| {
            let is_set = graph.node_by_id(qnode).map(|n| n.is_set).unwrap_or(false);
            if is_set {
                qnode.clone()
            } else {
                format!("{qnode}-{curie}")
            }
        })
        .collect();
    tokens.sort();
    tokens.join(RESULT_KEY_SEPARATOR)
}

fn merge_group(group: Vec<Preresult>) -> TrapiResult {
    let mut node_bindings: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut edge_bindings: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    // Members of a group share the same traversal shape, so the i-th
    // position always refers to the same query edge.
    for preresult in &group {
        for entry in &preresult.entries {
            node_bindings
                .entry(entry.input_qnode.clone())
                .or_default()
                .insert(entry.input_curie.clone());
            node_bindings
                .entry(entry.output_qnode.clone())
                .or_default()
                .insert(entry.output_curie.clone());
            edge_bindings
                .entry(entry.qedge_id.clone())
                .or_default()
                .insert(entry.record_hash.clone());
        }
    }

    TrapiResult {
        node_bindings: node_bindings
            .into_iter()
            .map(|(qnode, curies)| (qnode, curies.into_iter().map(Binding::new).collect()))
            .collect(),
        edge_bindings: edge_bindings
            .into_iter()
            .map(|(qedge, hashes)| (qedge, hashes.into_iter().map(Binding::new).collect()))
            .collect(),
        score: PLACEHOLDER_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medgraph_core::trapi::{TrapiQEdge, TrapiQNode, TrapiQueryGraph};
    use medgraph_core::{NormalizedCurie, RecordNode};
    use std::collections::BTreeMap as Map;

    fn record(subject: &str, object: &str, qedge: &str) -> Record {
        Record {
            subject: RecordNode {
                original: subject.to_string(),
                normalized: NormalizedCurie::identity(subject),
                category: None,
            },
            object: RecordNode {
                original: object.to_string(),
                normalized: NormalizedCurie::identity(object),
                category: None,
            },
            predicate: "biolink:related_to".into(),
            api_name: "Test API".into(),
            source: "infores:test".into(),
            api_is_trapi: false,
            publications: Vec::new(),
            attributes: Map::new(),
            is_set: false,
            hash: format!("{qedge}:{subject}->{object}"),
            qedge_id: Some(qedge.to_string()),
        }
    }

    fn gene_disease_gene(middle_is_set: bool) -> QueryGraph {
        let mut nodes = Map::new();
        for (id, ids, is_set) in [
            ("n1", Some(vec!["NCBIGene:3778".to_string()]), false),
            ("n2", None, middle_is_set),
            ("n3", Some(vec!["NCBIGene:7289".to_string()]), false),
        ] {
            nodes.insert(
                id.to_string(),
                TrapiQNode {
                    ids,
                    categories: Some(vec!["biolink:Thing".into()]),
                    is_set: Some(is_set),
                },
            );
        }
        let mut edges = Map::new();
        edges.insert(
            "e01".to_string(),
            TrapiQEdge {
                subject: "n1".into(),
                object: "n2".into(),
                predicates: None,
            },
        );
        edges.insert(
            "e02".to_string(),
            TrapiQEdge {
                subject: "n2".into(),
                object: "n3".into(),
                predicates: None,
            },
        );
        QueryGraph::from_trapi(&TrapiQueryGraph { nodes, edges }).unwrap()
    }

    fn organized_two_hop(
        e01_pairs: &[(&str, &str)],
        e02_pairs: &[(&str, &str)],
    ) -> BTreeMap<String, OrganizedEdge> {
        let mut organized = BTreeMap::new();
        organized.insert(
            "e01".to_string(),
            OrganizedEdge {
                qedge_id: "e01".into(),
                input_qnode: "n1".into(),
                output_qnode: "n2".into(),
                records: e01_pairs
                    .iter()
                    .map(|(s, o)| record(s, o, "e01"))
                    .collect(),
                connected_to: ["e02".to_string()].into(),
            },
        );
        organized.insert(
            "e02".to_string(),
            OrganizedEdge {
                qedge_id: "e02".into(),
                // e02 executed reversed: input side is the fixed gene n3.
                input_qnode: "n3".into(),
                output_qnode: "n2".into(),
                records: e02_pairs
                    .iter()
                    .map(|(s, o)| record(s, o, "e02"))
                    .collect(),
                connected_to: ["e01".to_string()].into(),
            },
        );
        organized
    }

    #[test]
    fn test_two_hop_single_result() {
        let graph = gene_disease_gene(false);
        let organized = organized_two_hop(
            &[("NCBIGene:3778", "MONDO:0011122")],
            &[("NCBIGene:7289", "MONDO:0011122")],
        );

        let results = assemble(&graph, &organized);
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.node_bindings["n1"], vec![Binding::new("NCBIGene:3778")]);
        assert_eq!(result.node_bindings["n2"], vec![Binding::new("MONDO:0011122")]);
        assert_eq!(result.node_bindings["n3"], vec![Binding::new("NCBIGene:7289")]);
        assert_eq!(result.edge_bindings.len(), 2);
        assert_eq!(result.edge_bindings["e01"].len(), 1);
        assert_eq!(result.edge_bindings["e02"].len(), 1);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_is_set_consolidates_middle_node() {
        let pairs_e01 = [
            ("NCBIGene:3778", "MONDO:D1"),
            ("NCBIGene:3778", "MONDO:D2"),
            ("NCBIGene:3778", "MONDO:D3"),
        ];
        let pairs_e02 = [
            ("NCBIGene:7289", "MONDO:D1"),
            ("NCBIGene:7289", "MONDO:D2"),
            ("NCBIGene:7289", "MONDO:D3"),
        ];

        // Without is_set: one result per disease.
        let plain = assemble(
            &gene_disease_gene(false),
            &organized_two_hop(&pairs_e01, &pairs_e02),
        );
        assert_eq!(plain.len(), 3);

        // With is_set on n2: one consolidated result carrying all three.
        let set_results = assemble(
            &gene_disease_gene(true),
            &organized_two_hop(&pairs_e01, &pairs_e02),
        );
        assert_eq!(set_results.len(), 1);
        let n2: Vec<&str> = set_results[0].node_bindings["n2"]
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(n2, vec!["MONDO:D1", "MONDO:D2", "MONDO:D3"]);
        assert_eq!(set_results[0].edge_bindings["e01"].len(), 3);
    }

    #[test]
    fn test_join_mismatch_produces_no_result() {
        let graph = gene_disease_gene(false);
        let organized = organized_two_hop(
            &[("NCBIGene:3778", "MONDO:D1")],
            &[("NCBIGene:7289", "MONDO:D9")],
        );
        assert!(assemble(&graph, &organized).is_empty());
    }

    #[test]
    fn test_partial_join_keeps_matching_path_only() {
        let graph = gene_disease_gene(false);
        let organized = organized_two_hop(
            &[("NCBIGene:3778", "MONDO:D1"), ("NCBIGene:3778", "MONDO:D2")],
            &[("NCBIGene:7289", "MONDO:D1")],
        );
        let results = assemble(&graph, &organized);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_bindings["n2"], vec![Binding::new("MONDO:D1")]);
    }

    #[test]
    fn test_empty_edge_short_circuits() {
        let graph = gene_disease_gene(false);
        let organized = organized_two_hop(&[("NCBIGene:3778", "MONDO:D1")], &[]);
        assert!(assemble(&graph, &organized).is_empty());
    }

    #[test]
    fn test_bindings_sorted_for_determinism() {
        let graph = gene_disease_gene(true);
        let organized = organized_two_hop(
            &[("NCBIGene:3778", "MONDO:D2"), ("NCBIGene:3778", "MONDO:D1")],
            &[("NCBIGene:7289", "MONDO:D2"), ("NCBIGene:7289", "MONDO:D1")],
        );
        let results = assemble(&graph, &organized);
        assert_eq!(results.len(), 1);
        let n2: Vec<&str> = results[0].node_bindings["n2"]
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(n2, vec!["MONDO:D1", "MONDO:D2"], "sorted regardless of record order");
    }
}

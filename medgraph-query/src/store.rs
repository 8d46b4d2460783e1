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

//! Constraint propagation over stored records.
//!
//! For each query node shared by executed edges, only the intersection of
//! the edges' curie sets at that node can appear in a result. The pass
//! removes records outside the intersection from every incident edge and
//! iterates to a fixed point. Termination: every round either shrinks a
//! record set or changes nothing.

use crate::xedge::QXEdge;
use medgraph_core::QueryGraph;
use std::collections::BTreeSet;
use tracing::debug;

/// Run the two-way semi-join to a fixed point across all executed edges.
/// Updates node resolved-curie sets and entity counts as sets shrink.
pub fn propagate(graph: &mut QueryGraph, xedges: &mut [QXEdge]) {
    loop {
        let mut changed = false;

        for node_idx in 0..graph.nodes().len() {
            let incident: Vec<usize> = (0..xedges.len())
                .filter(|&i| {
                    xedges[i].executed
                        && graph.edge(xedges[i].edge_idx).touches(node_idx)
                })
                .collect();
            if incident.is_empty() {
                continue;
            }

            let mut allowed: Option<BTreeSet<String>> = None;
            for &i in &incident {
                let curies = xedges[i].record_curies_at(graph, node_idx);
                allowed = Some(match allowed {
                    None => curies,
                    Some(acc) => acc.intersection(&curies).cloned().collect(),
                });
            }
            let allowed = allowed.unwrap_or_default();

            for &i in &incident {
                let before = xedges[i].records.len();
                let xedge = &mut xedges[i];
                let input_node = xedge.input_node(graph);
                xedge.records.retain(|r| {
                    let curie = if node_idx == input_node {
                        r.subject.curie()
                    } else {
                        r.object.curie()
                    };
                    allowed.contains(curie)
                });
                if xedges[i].records.len() != before {
                    debug!(
                        edge = %xedges[i].id,
                        node = %graph.node(node_idx).id,
                        removed = before - xedges[i].records.len(),
                        "pruned records outside neighbor intersection"
                    );
                    changed = true;
                }
            }

            let node = graph.node_mut(node_idx);
            node.resolved_curies = allowed;
            node.entity_count = node.resolved_curies.len();
        }

        if !changed {
            break;
        }
    }

    for xedge in xedges.iter_mut() {
        xedge.refresh_bindings(graph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medgraph_core::trapi::{TrapiQEdge, TrapiQNode, TrapiQueryGraph};
    use medgraph_core::{NormalizedCurie, Record, RecordNode};
    use std::collections::BTreeMap;

    fn record(subject: &str, object: &str) -> Record {
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
            attributes: BTreeMap::new(),
            is_set: false,
            hash: format!("{subject}->{object}"),
            qedge_id: None,
        }
    }

    /// n1 -e01-> n2 <-e02- n3, both edges executed toward n2.
    fn two_hop() -> (QueryGraph, Vec<QXEdge>) {
        let mut nodes = BTreeMap::new();
        for (id, ids) in [
            ("n1", Some(vec!["NCBIGene:3778".to_string()])),
            ("n2", None),
            ("n3", Some(vec!["NCBIGene:7289".to_string()])),
        ] {
            nodes.insert(
                id.to_string(),
                TrapiQNode {
                    ids,
                    categories: Some(vec!["biolink:Thing".into()]),
                    is_set: None,
                },
            );
        }
        let mut edges = BTreeMap::new();
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
        let graph = QueryGraph::from_trapi(&TrapiQueryGraph { nodes, edges }).unwrap();
        let xedges = vec![
            QXEdge::new(0, "e01".into(), false, None),
            QXEdge::new(1, "e02".into(), true, None),
        ];
        (graph, xedges)
    }

    #[test]
    fn test_dead_end_pruned_from_neighbor() {
        let (mut graph, mut xedges) = two_hop();
        xedges[0].executed = true;
        xedges[0].records = vec![
            record("NCBIGene:3778", "MONDO:D1"),
            record("NCBIGene:3778", "MONDO:D2"),
        ];
        xedges[1].executed = true;
        xedges[1].records = vec![record("NCBIGene:7289", "MONDO:D1")];

        propagate(&mut graph, &mut xedges);

        assert_eq!(xedges[0].records.len(), 1);
        assert_eq!(xedges[0].records[0].object.curie(), "MONDO:D1");
        assert_eq!(xedges[1].records.len(), 1);
        let n2 = graph.node_by_id("n2").unwrap();
        assert_eq!(n2.entity_count, 1);
        assert!(n2.resolved_curies.contains("MONDO:D1"));
    }

    #[test]
    fn test_disjoint_sets_empty_both_edges() {
        let (mut graph, mut xedges) = two_hop();
        xedges[0].executed = true;
        xedges[0].records = vec![record("NCBIGene:3778", "MONDO:D1")];
        xedges[1].executed = true;
        xedges[1].records = vec![record("NCBIGene:7289", "MONDO:D9")];

        propagate(&mut graph, &mut xedges);

        assert!(xedges[0].records.is_empty());
        assert!(xedges[1].records.is_empty());
        assert_eq!(graph.node_by_id("n2").unwrap().entity_count, 0);
    }

    #[test]
    fn test_single_executed_edge_untouched() {
        let (mut graph, mut xedges) = two_hop();
        xedges[0].executed = true;
        xedges[0].records = vec![
            record("NCBIGene:3778", "MONDO:D1"),
            record("NCBIGene:3778", "MONDO:D2"),
        ];

        propagate(&mut graph, &mut xedges);

        assert_eq!(xedges[0].records.len(), 2);
        assert_eq!(graph.node_by_id("n2").unwrap().entity_count, 2);
        assert_eq!(
            xedges[0].output_curies.len(),
            2,
            "bindings refreshed from surviving records"
        );
    }
}

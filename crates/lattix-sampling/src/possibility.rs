//! Per-relation sets of entities seen as head or tail.

use crate::graph::KnowledgeGraph;
use std::collections::BTreeSet;

/// Entities historically observed in each position of each relation.
///
/// Built from the training graph, optionally extended with the validation
/// graph. Never feed it the test graph: that would leak test entities into
/// the negatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PossibilityIndex {
    possible_heads: Vec<Vec<u32>>,
    possible_tails: Vec<Vec<u32>>,
}

impl PossibilityIndex {
    pub fn from_graph(kg: &KnowledgeGraph) -> Self {
        Self::from_graphs(kg, None)
    }

    /// Index `kg` plus, when given and non-empty, a validation graph.
    pub fn from_graphs(kg: &KnowledgeGraph, kg_val: Option<&KnowledgeGraph>) -> Self {
        let mut index = Self {
            possible_heads: vec![Vec::new(); kg.n_rel()],
            possible_tails: vec![Vec::new(); kg.n_rel()],
        };
        index.extend(kg);
        if let Some(kg_val) = kg_val.filter(|g| !g.is_empty()) {
            index.extend(kg_val);
        }
        index
    }

    /// Merge the facts of another graph over the same vocabulary.
    pub fn extend(&mut self, kg: &KnowledgeGraph) {
        let n_rel = self.possible_heads.len().max(kg.n_rel());
        let mut heads = to_sets(&self.possible_heads);
        let mut tails = to_sets(&self.possible_tails);
        heads.resize_with(n_rel, BTreeSet::new);
        tails.resize_with(n_rel, BTreeSet::new);

        for fact in kg.facts() {
            heads[fact.relation as usize].insert(fact.head);
            tails[fact.relation as usize].insert(fact.tail);
        }

        self.possible_heads = heads.into_iter().map(|s| s.into_iter().collect()).collect();
        self.possible_tails = tails.into_iter().map(|s| s.into_iter().collect()).collect();
    }

    pub fn n_rel(&self) -> usize {
        self.possible_heads.len()
    }

    /// Sorted distinct heads of `relation`; empty if it has no facts.
    pub fn possible_heads(&self, relation: u32) -> &[u32] {
        self.possible_heads
            .get(relation as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sorted distinct tails of `relation`; empty if it has no facts.
    pub fn possible_tails(&self, relation: u32) -> &[u32] {
        self.possible_tails
            .get(relation as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn n_possible_heads(&self, relation: u32) -> usize {
        self.possible_heads(relation).len()
    }

    pub fn n_possible_tails(&self, relation: u32) -> usize {
        self.possible_tails(relation).len()
    }
}

fn to_sets(lists: &[Vec<u32>]) -> Vec<BTreeSet<u32>> {
    lists.iter().map(|v| v.iter().copied().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Fact;

    #[test]
    fn test_chain_possibilities() {
        let kg = KnowledgeGraph::new(4, 1, [Fact::new(1, 0, 2), Fact::new(2, 0, 3)]).unwrap();
        let index = PossibilityIndex::from_graph(&kg);

        assert_eq!(index.possible_heads(0), &[1, 2]);
        assert_eq!(index.possible_tails(0), &[2, 3]);
        assert_eq!(index.n_possible_heads(0), 2);
        assert_eq!(index.n_possible_tails(0), 2);
    }

    #[test]
    fn test_relation_without_facts() {
        let kg = KnowledgeGraph::new(4, 3, [Fact::new(1, 0, 2)]).unwrap();
        let index = PossibilityIndex::from_graph(&kg);

        assert_eq!(index.n_rel(), 3);
        assert!(index.possible_heads(1).is_empty());
        assert!(index.possible_tails(2).is_empty());
        assert_eq!(index.n_possible_heads(2), 0);
        // relations outside the vocabulary behave the same way
        assert_eq!(index.n_possible_tails(42), 0);
    }

    #[test]
    fn test_validation_extends_sets() {
        let train = KnowledgeGraph::new(6, 2, [Fact::new(3, 0, 1), Fact::new(1, 0, 2)]).unwrap();
        let val = KnowledgeGraph::new(6, 2, [Fact::new(5, 0, 1), Fact::new(4, 1, 0)]).unwrap();

        let index = PossibilityIndex::from_graphs(&train, Some(&val));
        assert_eq!(index.possible_heads(0), &[1, 3, 5]);
        assert_eq!(index.possible_tails(0), &[1, 2]);
        assert_eq!(index.possible_heads(1), &[4]);
        assert_eq!(index.possible_tails(1), &[0]);
    }

    #[test]
    fn test_empty_validation_ignored() {
        let train = KnowledgeGraph::new(4, 1, [Fact::new(1, 0, 2)]).unwrap();
        let val = KnowledgeGraph::new(4, 1, Vec::<Fact>::new()).unwrap();

        assert_eq!(
            PossibilityIndex::from_graphs(&train, Some(&val)),
            PossibilityIndex::from_graph(&train)
        );
    }

    #[test]
    fn test_rebuild_is_identical() {
        let kg = KnowledgeGraph::from_facts([
            Fact::new(7, 1, 2),
            Fact::new(0, 1, 2),
            Fact::new(3, 0, 9),
        ]);
        assert_eq!(PossibilityIndex::from_graph(&kg), PossibilityIndex::from_graph(&kg));
    }
}

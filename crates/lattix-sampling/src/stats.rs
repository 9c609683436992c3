//! Relation-wise corruption-direction probabilities.
//!
//! Wang et al. (2014, TransH) observe that uniform head/tail corruption
//! produces many false negatives on relations that are functional in one
//! direction. For a relation `r` let
//!
//! ```text
//! tph(r) = mean over distinct heads h of |{ t : (h, r, t) }|
//! hpt(r) = mean over distinct tails t of |{ h : (h, r, t) }|
//! ```
//!
//! The head is corrupted with probability `tph / (tph + hpt)`: a one-to-many
//! relation (large `tph`) has many valid tails per head, so replacing the
//! head is less likely to hit another true fact.
//!
//! # Reference
//!
//! Wang, Zhang, Feng & Chen (2014). "Knowledge Graph Embedding by
//! Translating on Hyperplanes." AAAI.

use crate::error::Result;
use crate::graph::KnowledgeGraph;
use candle_core::{Device, Tensor};
use std::collections::{HashMap, HashSet};

/// Head-corruption probability for relations never observed.
pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Per-relation head-corruption probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationStatistics {
    /// `None` for relations without facts.
    probs: Vec<Option<f64>>,
}

impl RelationStatistics {
    /// Scan all facts of `kg` once.
    pub fn from_graph(kg: &KnowledgeGraph) -> Self {
        let mut tails_of: HashMap<(u32, u32), HashSet<u32>> = HashMap::new();
        let mut heads_of: HashMap<(u32, u32), HashSet<u32>> = HashMap::new();

        for fact in kg.facts() {
            tails_of
                .entry((fact.relation, fact.head))
                .or_default()
                .insert(fact.tail);
            heads_of
                .entry((fact.relation, fact.tail))
                .or_default()
                .insert(fact.head);
        }

        let tph = mean_group_size(&tails_of, kg.n_rel());
        let hpt = mean_group_size(&heads_of, kg.n_rel());

        let probs = tph
            .into_iter()
            .zip(hpt)
            .map(|(tph, hpt)| match (tph, hpt) {
                (Some(tph), Some(hpt)) => Some(tph / (tph + hpt)),
                _ => None,
            })
            .collect();

        Self { probs }
    }

    pub fn n_rel(&self) -> usize {
        self.probs.len()
    }

    /// Observed probability, `None` if `relation` has no facts.
    pub fn probability(&self, relation: u32) -> Option<f64> {
        self.probs.get(relation as usize).copied().flatten()
    }

    /// Observed probability, [`DEFAULT_PROBABILITY`] if unseen.
    pub fn probability_or_default(&self, relation: u32) -> f64 {
        self.probability(relation).unwrap_or(DEFAULT_PROBABILITY)
    }

    /// Dense vector of length `n_rel` with defaults filled in.
    pub fn probabilities(&self) -> Vec<f64> {
        self.probs
            .iter()
            .map(|p| p.unwrap_or(DEFAULT_PROBABILITY))
            .collect()
    }

    /// Dense `f32` tensor of length `n_rel`, for scoring code that gathers by relation.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        let probs: Vec<f32> = self.probabilities().into_iter().map(|p| p as f32).collect();
        Ok(Tensor::from_vec(probs, self.n_rel(), device)?)
    }
}

/// Mean group size per relation, `None` where a relation has no groups.
fn mean_group_size(groups: &HashMap<(u32, u32), HashSet<u32>>, n_rel: usize) -> Vec<Option<f64>> {
    let mut totals = vec![(0usize, 0usize); n_rel];
    for (&(relation, _), members) in groups {
        let slot = &mut totals[relation as usize];
        slot.0 += members.len();
        slot.1 += 1;
    }

    totals
        .into_iter()
        .map(|(sum, count)| (count > 0).then(|| sum as f64 / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Fact;

    #[test]
    fn test_chain_is_balanced() {
        // 1 -r0-> 2 -r0-> 3: one tail per head, one head per tail
        let kg = KnowledgeGraph::new(4, 1, [Fact::new(1, 0, 2), Fact::new(2, 0, 3)]).unwrap();
        let stats = RelationStatistics::from_graph(&kg);

        assert_eq!(stats.n_rel(), 1);
        assert!((stats.probability(0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_one_to_many_prefers_head() {
        // head 1 has three tails: tph = 3, hpt = 1
        let kg = KnowledgeGraph::new(
            5,
            1,
            [Fact::new(1, 0, 2), Fact::new(1, 0, 3), Fact::new(1, 0, 4)],
        )
        .unwrap();
        let stats = RelationStatistics::from_graph(&kg);

        assert!((stats.probability(0).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_many_to_one_prefers_tail() {
        let kg = KnowledgeGraph::new(
            5,
            1,
            [Fact::new(1, 0, 4), Fact::new(2, 0, 4), Fact::new(3, 0, 4)],
        )
        .unwrap();
        let stats = RelationStatistics::from_graph(&kg);

        assert!((stats.probability(0).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_duplicates_do_not_count() {
        let kg = KnowledgeGraph::new(
            4,
            1,
            [Fact::new(1, 0, 2), Fact::new(1, 0, 2), Fact::new(1, 0, 3)],
        )
        .unwrap();
        let stats = RelationStatistics::from_graph(&kg);

        // tph = 2 distinct tails, hpt = 1
        assert!((stats.probability(0).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unseen_relation_defaults() {
        let kg = KnowledgeGraph::new(4, 3, [Fact::new(1, 0, 2)]).unwrap();
        let stats = RelationStatistics::from_graph(&kg);

        assert_eq!(stats.n_rel(), 3);
        assert!(stats.probability(2).is_none());
        assert!((stats.probability_or_default(2) - DEFAULT_PROBABILITY).abs() < 1e-12);
        assert!((stats.probability_or_default(99) - DEFAULT_PROBABILITY).abs() < 1e-12);
        assert_eq!(stats.probabilities(), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let kg = KnowledgeGraph::from_facts([
            Fact::new(0, 0, 1),
            Fact::new(0, 0, 2),
            Fact::new(3, 1, 2),
            Fact::new(4, 1, 2),
        ]);
        assert_eq!(
            RelationStatistics::from_graph(&kg),
            RelationStatistics::from_graph(&kg)
        );
    }

    #[test]
    fn test_to_tensor() {
        let kg = KnowledgeGraph::new(5, 2, [Fact::new(1, 0, 2), Fact::new(1, 0, 3)]).unwrap();
        let stats = RelationStatistics::from_graph(&kg);
        let probs = stats.to_tensor(&Device::Cpu).unwrap().to_vec1::<f32>().unwrap();

        assert_eq!(probs.len(), 2);
        assert!((probs[0] - 2.0 / 3.0).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }
}

use super::{HostBatch, NegativeSampler};
use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use crate::possibility::PossibilityIndex;
use crate::stats::RelationStatistics;
use candle_core::Tensor;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, warn};

/// Bernoulli side choice, with the substitute drawn from entities already
/// seen in that position of that relation.
///
/// Negatives produced this way are type-plausible ("a city as the tail of
/// `capital_of`") and therefore harder than uniform ones. A relation with no
/// observed entities in the chosen position falls back to `[0, n_ent)`.
///
/// One corruption per triplet with the default `n_neg = 1`; an explicit
/// `n_neg > 1` yields `n_neg` independent draws per triplet.
#[derive(Debug, Clone)]
pub struct PositionalSampler {
    n_ent: u32,
    stats: RelationStatistics,
    index: PossibilityIndex,
    n_neg: usize,
    rng: StdRng,
}

impl PositionalSampler {
    /// Build statistics from `kg` and possibilities from `kg` plus `kg_val`.
    pub fn new(kg: &KnowledgeGraph, kg_val: Option<&KnowledgeGraph>, config: &SamplerConfig) -> Result<Self> {
        Self::from_parts(
            kg.n_ent(),
            RelationStatistics::from_graph(kg),
            PossibilityIndex::from_graphs(kg, kg_val),
            config,
        )
    }

    pub fn from_parts(
        n_ent: usize,
        stats: RelationStatistics,
        index: PossibilityIndex,
        config: &SamplerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let n_ent = u32::try_from(n_ent)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| Error::InvalidConfig(format!("unusable entity count {}", n_ent)))?;

        let empty = (0..index.n_rel() as u32)
            .filter(|&r| index.n_possible_heads(r) == 0 || index.n_possible_tails(r) == 0)
            .count();
        if empty > 0 {
            warn!(relations = empty, "relations without observed entities fall back to uniform draws");
        }
        info!(n_ent, n_rel = index.n_rel(), n_neg = config.n_neg, "positional sampler ready");

        Ok(Self {
            n_ent,
            stats,
            index,
            n_neg: config.n_neg,
            rng: config.rng(),
        })
    }

    pub fn possibilities(&self) -> &PossibilityIndex {
        &self.index
    }

    pub fn statistics(&self) -> &RelationStatistics {
        &self.stats
    }
}

fn pick(rng: &mut StdRng, pool: &[u32], n_ent: u32) -> u32 {
    if pool.is_empty() {
        rng.random_range(0..n_ent)
    } else {
        pool[rng.random_range(0..pool.len())]
    }
}

impl NegativeSampler for PositionalSampler {
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)> {
        let batch = HostBatch::read(heads, tails, relations, n_neg)?;
        let (n_ent, stats, index) = (self.n_ent, &self.stats, &self.index);
        let (neg_heads, neg_tails) = batch.corrupt_with(
            n_neg,
            &mut self.rng,
            |r| stats.probability_or_default(r),
            |rng, f| Ok(pick(rng, index.possible_heads(f.relation), n_ent)),
            |rng, f| Ok(pick(rng, index.possible_tails(f.relation), n_ent)),
        )?;
        batch.to_device(neg_heads, neg_tails)
    }

    fn n_neg(&self) -> usize {
        self.n_neg
    }

    fn name(&self) -> &'static str {
        "positional"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::ids;
    use super::*;
    use crate::graph::Fact;

    #[test]
    fn test_substitutes_come_from_possibilities() {
        let kg = KnowledgeGraph::new(
            50,
            2,
            [
                Fact::new(1, 0, 10),
                Fact::new(2, 0, 11),
                Fact::new(3, 0, 12),
                Fact::new(20, 1, 30),
                Fact::new(21, 1, 31),
            ],
        )
        .unwrap();
        let mut sampler = PositionalSampler::new(&kg, None, &SamplerConfig::default().with_seed(8)).unwrap();

        let heads = [1, 20];
        let tails = [10, 30];
        let (nh, nt) = sampler
            .corrupt_batch(&ids(&heads), &ids(&tails), &ids(&[0, 1]), 50)
            .unwrap();
        let nh = nh.to_vec1::<u32>().unwrap();
        let nt = nt.to_vec1::<u32>().unwrap();

        for pos in 0..100 {
            let j = pos % 2;
            let relation = j as u32;
            if nh[pos] != heads[j] {
                assert!(sampler.possibilities().possible_heads(relation).contains(&nh[pos]));
            }
            if nt[pos] != tails[j] {
                assert!(sampler.possibilities().possible_tails(relation).contains(&nt[pos]));
            }
        }
    }

    #[test]
    fn test_validation_entities_are_drawn() {
        let train = KnowledgeGraph::new(10, 1, [Fact::new(1, 0, 2)]).unwrap();
        let val = KnowledgeGraph::new(10, 1, [Fact::new(7, 0, 2)]).unwrap();
        let mut sampler = PositionalSampler::new(&train, Some(&val), &SamplerConfig::default().with_seed(2)).unwrap();

        assert_eq!(sampler.possibilities().possible_heads(0), &[1, 7]);
        let (nh, _) = sampler
            .corrupt_batch(&ids(&[1]), &ids(&[2]), &ids(&[0]), 200)
            .unwrap();
        assert!(nh.to_vec1::<u32>().unwrap().contains(&7));
    }

    #[test]
    fn test_unseen_relation_falls_back() {
        let kg = KnowledgeGraph::new(6, 2, [Fact::new(1, 0, 2)]).unwrap();
        let mut sampler = PositionalSampler::new(&kg, None, &SamplerConfig::default().with_seed(5)).unwrap();

        let (nh, nt) = sampler
            .corrupt_batch(&ids(&[3]), &ids(&[4]), &ids(&[1]), 100)
            .unwrap();
        let nh = nh.to_vec1::<u32>().unwrap();
        let nt = nt.to_vec1::<u32>().unwrap();
        assert!(nh.iter().chain(&nt).all(|&e| e < 6));
        assert_eq!(nh.len(), 100);
    }

    #[test]
    fn test_default_n_neg_is_one() {
        let kg = KnowledgeGraph::new(6, 1, [Fact::new(1, 0, 2), Fact::new(3, 0, 4)]).unwrap();
        let mut sampler = PositionalSampler::new(&kg, None, &SamplerConfig::default()).unwrap();
        let batch = crate::batch::TripletBatch::from_slices(&[1, 3], &[2, 4], &[0, 0], &candle_core::Device::Cpu).unwrap();

        let (nh, nt) = sampler.corrupt(&batch).unwrap();
        assert_eq!(nh.dims(), &[2]);
        assert_eq!(nt.dims(), &[2]);
    }

    #[test]
    fn test_explicit_n_neg_replicates() {
        let kg = KnowledgeGraph::new(6, 1, [Fact::new(1, 0, 2), Fact::new(3, 0, 4)]).unwrap();
        let mut sampler = PositionalSampler::new(&kg, None, &SamplerConfig::default()).unwrap();

        let (nh, nt) = sampler
            .corrupt_batch(&ids(&[1, 3]), &ids(&[2, 4]), &ids(&[0, 0]), 3)
            .unwrap();
        assert_eq!(nh.dims(), &[6]);
        assert_eq!(nt.dims(), &[6]);
    }
}

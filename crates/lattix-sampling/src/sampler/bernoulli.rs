use super::{nonzero_entities, HostBatch, NegativeSampler};
use crate::config::SamplerConfig;
use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::stats::RelationStatistics;
use candle_core::Tensor;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use tracing::info;

/// Choose the side by the relation's head-corruption probability, replace it
/// with an entity drawn uniformly from `[1, n_ent)`.
#[derive(Debug, Clone)]
pub struct BernoulliSampler {
    stats: RelationStatistics,
    entities: Uniform<u32>,
    n_neg: usize,
    rng: StdRng,
}

impl BernoulliSampler {
    pub fn new(kg: &KnowledgeGraph, config: &SamplerConfig) -> Result<Self> {
        Self::with_statistics(kg.n_ent(), RelationStatistics::from_graph(kg), config)
    }

    /// Reuse statistics computed elsewhere.
    pub fn with_statistics(n_ent: usize, stats: RelationStatistics, config: &SamplerConfig) -> Result<Self> {
        config.validate()?;
        info!(n_ent, n_rel = stats.n_rel(), n_neg = config.n_neg, "bernoulli sampler ready");
        Ok(Self {
            stats,
            entities: nonzero_entities(n_ent)?,
            n_neg: config.n_neg,
            rng: config.rng(),
        })
    }

    pub fn statistics(&self) -> &RelationStatistics {
        &self.stats
    }
}

impl NegativeSampler for BernoulliSampler {
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)> {
        let batch = HostBatch::read(heads, tails, relations, n_neg)?;
        let entities = self.entities;
        let stats = &self.stats;
        let (neg_heads, neg_tails) = batch.corrupt_with(
            n_neg,
            &mut self.rng,
            |r| stats.probability_or_default(r),
            |rng, _| Ok(entities.sample(rng)),
            |rng, _| Ok(entities.sample(rng)),
        )?;
        batch.to_device(neg_heads, neg_tails)
    }

    fn n_neg(&self) -> usize {
        self.n_neg
    }

    fn name(&self) -> &'static str {
        "bernoulli"
    }
}

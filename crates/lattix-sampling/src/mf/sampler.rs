use super::cache::CandidateCache;
use super::model::MfModel;
use crate::config::{MfConfig, SamplerConfig};
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use crate::sampler::{HostBatch, NegativeSampler};
use crate::stats::RelationStatistics;
use candle_core::Tensor;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;

/// Bernoulli side choice with substitutes looked up in a learned cache.
///
/// Construction trains an [`MfModel`] on the graph and builds a
/// [`CandidateCache`] from it; both are frozen afterwards. Batches must come
/// from the graph the cache was built on: any `(entity, relation)` key not
/// seen then is [`Error::CacheMiss`].
pub struct MfSampler {
    stats: RelationStatistics,
    model: MfModel,
    cache: CandidateCache,
    loss_history: Vec<f32>,
    n_neg: usize,
    rng: StdRng,
}

impl MfSampler {
    pub fn new(kg: &KnowledgeGraph, config: &SamplerConfig, mf: &MfConfig) -> Result<Self> {
        config.validate()?;
        if kg.n_ent() == 0 {
            return Err(Error::InvalidConfig("graph has no entities".into()));
        }

        let mut rng = config.rng();
        let (model, loss_history) = MfModel::train(kg, mf)?;
        let cache = CandidateCache::build(kg, &model, mf.cache_dim, &mut rng)?;
        info!(
            n_ent = kg.n_ent(),
            n_facts = kg.n_facts(),
            n_neg = config.n_neg,
            "mf sampler ready"
        );

        Ok(Self {
            stats: RelationStatistics::from_graph(kg),
            model,
            cache,
            loss_history,
            n_neg: config.n_neg,
            rng,
        })
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    pub fn model(&self) -> &MfModel {
        &self.model
    }

    /// Mean training loss of each pass.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    pub fn statistics(&self) -> &RelationStatistics {
        &self.stats
    }
}

fn pick(rng: &mut StdRng, pool: &[u32]) -> u32 {
    pool[rng.random_range(0..pool.len())]
}

impl NegativeSampler for MfSampler {
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)> {
        let batch = HostBatch::read(heads, tails, relations, n_neg)?;
        let (stats, cache) = (&self.stats, &self.cache);

        // every key is checked up front, not only the sides the coin picks
        for j in 0..batch.len() {
            let fact = batch.fact(j);
            cache.head_pool(fact.tail, fact.relation)?;
            cache.tail_pool(fact.head, fact.relation)?;
        }

        let (neg_heads, neg_tails) = batch.corrupt_with(
            n_neg,
            &mut self.rng,
            |r| stats.probability_or_default(r),
            |rng, f| Ok(pick(rng, cache.head_pool(f.tail, f.relation)?)),
            |rng, f| Ok(pick(rng, cache.tail_pool(f.head, f.relation)?)),
        )?;
        batch.to_device(neg_heads, neg_tails)
    }

    fn n_neg(&self) -> usize {
        self.n_neg
    }

    fn name(&self) -> &'static str {
        "mf"
    }
}

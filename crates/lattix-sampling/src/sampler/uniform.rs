use super::{nonzero_entities, HostBatch, NegativeSampler};
use crate::config::SamplerConfig;
use crate::error::Result;
use crate::graph::KnowledgeGraph;
use candle_core::Tensor;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use tracing::info;

/// Flip a fair coin per position, replace the chosen side with an entity
/// drawn uniformly from `[1, n_ent)`.
#[derive(Debug, Clone)]
pub struct UniformSampler {
    n_ent: usize,
    entities: Uniform<u32>,
    n_neg: usize,
    rng: StdRng,
}

impl UniformSampler {
    pub fn new(kg: &KnowledgeGraph, config: &SamplerConfig) -> Result<Self> {
        Self::with_n_ent(kg.n_ent(), config)
    }

    /// Build from the vocabulary size alone; no graph scan is needed.
    pub fn with_n_ent(n_ent: usize, config: &SamplerConfig) -> Result<Self> {
        config.validate()?;
        info!(n_ent, n_neg = config.n_neg, "uniform sampler ready");
        Ok(Self {
            n_ent,
            entities: nonzero_entities(n_ent)?,
            n_neg: config.n_neg,
            rng: config.rng(),
        })
    }

    pub fn n_ent(&self) -> usize {
        self.n_ent
    }
}

impl NegativeSampler for UniformSampler {
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)> {
        let batch = HostBatch::read(heads, tails, relations, n_neg)?;
        let entities = self.entities;
        let (neg_heads, neg_tails) = batch.corrupt_with(
            n_neg,
            &mut self.rng,
            |_| 0.5,
            |rng, _| Ok(entities.sample(rng)),
            |rng, _| Ok(entities.sample(rng)),
        )?;
        batch.to_device(neg_heads, neg_tails)
    }

    fn n_neg(&self) -> usize {
        self.n_neg
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

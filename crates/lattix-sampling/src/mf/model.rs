//! Bilinear head/tail factorization used only to rank substitutes.
//!
//! Each entity has a head-role and a tail-role vector; a pair scores
//! `<head_emb(h), tail_emb(t)>`. Training regresses that score onto the
//! relation id. Relation ids carry no order, so the fit is crude, but the
//! rounded score is enough to separate "looks like relation r" from
//! "looks like something else" when building candidate pools.

use crate::batch::{BatchLoader, Placement};
use crate::config::MfConfig;
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use candle_core::{DType, Device, Tensor};
use candle_nn::init::Init;
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use candle_nn::{Embedding, Module, VarBuilder, VarMap};
use tracing::{debug, info};

/// Two embedding tables over a shared entity vocabulary.
pub struct MfModel {
    head_emb: Embedding,
    tail_emb: Embedding,
    varmap: VarMap,
    n_ent: usize,
    device: Device,
}

impl MfModel {
    /// Fresh model with both tables drawn from `U(0, init_scale)`.
    pub fn new(n_ent: usize, n_factors: usize, init_scale: f64, device: &Device) -> Result<Self> {
        if n_ent == 0 || n_factors == 0 {
            return Err(Error::InvalidConfig(format!(
                "factorization needs entities and factors, got n_ent={} n_factors={}",
                n_ent, n_factors
            )));
        }

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let init = Init::Uniform {
            lo: 0.0,
            up: init_scale,
        };
        let head = vb.pp("head").get_with_hints((n_ent, n_factors), "weight", init)?;
        let tail = vb.pp("tail").get_with_hints((n_ent, n_factors), "weight", init)?;

        Ok(Self {
            head_emb: Embedding::new(head, n_factors),
            tail_emb: Embedding::new(tail, n_factors),
            varmap,
            n_ent,
            device: device.clone(),
        })
    }

    /// Build and fit a model on `kg`. Returns it with the mean loss of each pass.
    pub fn train(kg: &KnowledgeGraph, config: &MfConfig) -> Result<(Self, Vec<f32>)> {
        config.validate()?;
        let device = if config.use_accelerator {
            Device::cuda_if_available(0)?
        } else {
            Device::Cpu
        };

        let mut model = Self::new(kg.n_ent(), config.n_factors, config.init_scale, &device)?;
        let history = model.fit(kg, config)?;
        Ok((model, history))
    }

    /// Run `config.n_iter` passes of AdamW over `kg`.
    pub fn fit(&mut self, kg: &KnowledgeGraph, config: &MfConfig) -> Result<Vec<f32>> {
        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(self.varmap.all_vars(), params)?;
        let loader = BatchLoader::new(kg, config.batch_size)?
            .with_placement(Placement::Resident(self.device.clone()))?;

        let mut history = Vec::with_capacity(config.n_iter);
        if kg.is_empty() {
            return Ok(history);
        }

        for pass in 0..config.n_iter {
            let mut total = 0.0f32;
            let mut batches = 0usize;

            for batch in loader.iter() {
                let batch = batch?;
                let target = batch.relations.to_dtype(DType::F32)?;
                let pred = self.forward(&batch.heads, &batch.tails)?;
                let loss = candle_nn::loss::mse(&pred, &target)?;
                optimizer.backward_step(&loss)?;

                total += loss.to_scalar::<f32>()?;
                batches += 1;
            }

            let mean = total / batches.max(1) as f32;
            debug!(pass, loss = mean, "factorization pass");
            history.push(mean);
        }

        info!(
            passes = config.n_iter,
            final_loss = history.last().copied().unwrap_or(0.0),
            "factorization model trained"
        );
        Ok(history)
    }

    /// Row-wise `<head_emb(h), tail_emb(t)>` for equal-length id tensors.
    pub fn forward(&self, heads: &Tensor, tails: &Tensor) -> Result<Tensor> {
        let h = self.head_emb.forward(heads)?;
        let t = self.tail_emb.forward(tails)?;
        Ok((h * t)?.sum(1)?)
    }

    /// Scores of `head` (head role) against each candidate tail.
    pub fn score_tails(&self, head: u32, candidates: &[u32]) -> Result<Vec<f32>> {
        self.score_against(head, &self.head_emb, &self.tail_emb, candidates)
    }

    /// Scores of each candidate head against `tail` (tail role).
    pub fn score_heads(&self, tail: u32, candidates: &[u32]) -> Result<Vec<f32>> {
        self.score_against(tail, &self.tail_emb, &self.head_emb, candidates)
    }

    fn score_against(
        &self,
        anchor: u32,
        anchor_table: &Embedding,
        candidate_table: &Embedding,
        candidates: &[u32],
    ) -> Result<Vec<f32>> {
        if anchor as usize >= self.n_ent {
            return Err(Error::EntityOutOfRange {
                id: anchor,
                n_ent: self.n_ent,
            });
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let anchor = anchor_table.embeddings().get(anchor as usize)?;
        let ids = Tensor::from_slice(candidates, candidates.len(), &self.device)?;
        let scores = candidate_table
            .forward(&ids)?
            .broadcast_mul(&anchor.unsqueeze(0)?)?
            .sum(1)?;
        Ok(scores.to_vec1::<f32>()?)
    }

    pub fn n_ent(&self) -> usize {
        self.n_ent
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

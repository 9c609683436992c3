//! Whole-split corruption.

use crate::batch::{BatchLoader, Placement};
use crate::error::{Error, Result};
use crate::graph::{KnowledgeGraph, Split};
use crate::sampler::NegativeSampler;
use candle_core::{DType, Device, Tensor};
use tracing::{debug, info};

/// Runs a sampler over every fact of a train, validation or test graph.
pub struct GraphCorruptor<'a, S> {
    sampler: S,
    kg: &'a KnowledgeGraph,
    kg_val: Option<&'a KnowledgeGraph>,
    kg_test: Option<&'a KnowledgeGraph>,
}

impl<'a, S: NegativeSampler> GraphCorruptor<'a, S> {
    pub fn new(sampler: S, kg: &'a KnowledgeGraph) -> Self {
        Self {
            sampler,
            kg,
            kg_val: None,
            kg_test: None,
        }
    }

    pub fn with_validation(mut self, kg_val: &'a KnowledgeGraph) -> Self {
        self.kg_val = Some(kg_val);
        self
    }

    pub fn with_test(mut self, kg_test: &'a KnowledgeGraph) -> Self {
        self.kg_test = Some(kg_test);
        self
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn into_sampler(self) -> S {
        self.sampler
    }

    fn graph(&self, which: Split) -> Result<&'a KnowledgeGraph> {
        let graph = match which {
            Split::Train => Some(self.kg),
            Split::Validation => self.kg_val,
            Split::Test => self.kg_test,
        };
        match graph {
            Some(kg) if which == Split::Train || !kg.is_empty() => Ok(kg),
            _ => Err(Error::MissingGraph(which)),
        }
    }

    /// Corrupt every fact of `which` once.
    ///
    /// Returns `(neg_heads, neg_tails)` of length `n_facts` on the CPU, in
    /// fact order. With `use_accelerator` batches are uploaded to CUDA
    /// device 0 when one is available.
    pub fn corrupt_graph(
        &mut self,
        batch_size: usize,
        use_accelerator: bool,
        which: Split,
    ) -> Result<(Tensor, Tensor)> {
        let kg = self.graph(which)?;
        let device = if use_accelerator {
            Device::cuda_if_available(0)?
        } else {
            Device::Cpu
        };

        let placement = if device.is_cpu() {
            Placement::Host
        } else {
            Placement::PerBatch(device)
        };
        let loader = BatchLoader::new(kg, batch_size)?.with_placement(placement)?;

        let mut neg_heads = Vec::with_capacity(loader.num_batches());
        let mut neg_tails = Vec::with_capacity(loader.num_batches());
        for (i, batch) in loader.iter().enumerate() {
            let batch = batch?;
            let (h, t) = self
                .sampler
                .corrupt_batch(&batch.heads, &batch.tails, &batch.relations, 1)?;
            debug!(batch = i, len = batch.len(), "corrupted batch");
            neg_heads.push(h);
            neg_tails.push(t);
        }

        info!(
            split = %which,
            sampler = self.sampler.name(),
            n_facts = kg.n_facts(),
            "graph corrupted"
        );

        if neg_heads.is_empty() {
            let empty = Tensor::zeros(0, DType::U32, &Device::Cpu)?;
            return Ok((empty.clone(), empty));
        }

        Ok((
            Tensor::cat(&neg_heads, 0)?.to_device(&Device::Cpu)?,
            Tensor::cat(&neg_tails, 0)?.to_device(&Device::Cpu)?,
        ))
    }
}

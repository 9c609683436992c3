use super::model::MfModel;
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Write-once pools of substitute entities keyed by `(entity, relation)`.
///
/// `tail_pools[(h, r)]` holds tails to pair with `h`; `head_pools[(t, r)]`
/// holds heads to pair with `t`. Every pool has exactly `cache_dim` entries
/// and may repeat ids.
#[derive(Debug, Clone)]
pub struct CandidateCache {
    head_pools: HashMap<(u32, u32), Vec<u32>>,
    tail_pools: HashMap<(u32, u32), Vec<u32>>,
    cache_dim: usize,
}

impl CandidateCache {
    /// Score every key seen in `kg` with a trained model and sample its pool.
    ///
    /// For key `(h, r)` the candidates are all entities not already known as
    /// a tail of `h` whose rounded score against `h` is not `r`. When no
    /// entity qualifies the pool is drawn uniformly from `[0, n_ent)`.
    pub fn build(kg: &KnowledgeGraph, model: &MfModel, cache_dim: usize, rng: &mut StdRng) -> Result<Self> {
        if cache_dim == 0 {
            return Err(Error::InvalidConfig("cache_dim must be at least 1".into()));
        }

        let n_ent = model.n_ent() as u32;
        let mut cache = Self {
            head_pools: HashMap::new(),
            tail_pools: HashMap::new(),
            cache_dim,
        };
        let mut fallbacks = 0usize;

        for fact in kg.facts() {
            if let Entry::Vacant(slot) = cache.tail_pools.entry((fact.head, fact.relation)) {
                let candidates = unknown(kg.known_tails(fact.head), n_ent);
                let scores = model.score_tails(fact.head, &candidates)?;
                let kept = incompatible(&candidates, &scores, fact.relation);
                fallbacks += usize::from(kept.is_empty());
                slot.insert(draw_pool(&kept, cache_dim, n_ent, rng));
            }

            if let Entry::Vacant(slot) = cache.head_pools.entry((fact.tail, fact.relation)) {
                let candidates = unknown(kg.known_heads(fact.tail), n_ent);
                let scores = model.score_heads(fact.tail, &candidates)?;
                let kept = incompatible(&candidates, &scores, fact.relation);
                fallbacks += usize::from(kept.is_empty());
                slot.insert(draw_pool(&kept, cache_dim, n_ent, rng));
            }
        }

        if fallbacks > 0 {
            warn!(pools = fallbacks, "no incompatible candidates, pools drawn uniformly");
        }
        info!(
            head_keys = cache.head_pools.len(),
            tail_keys = cache.tail_pools.len(),
            cache_dim,
            "candidate cache built"
        );
        Ok(cache)
    }

    /// Substitute heads for facts ending in `tail` under `relation`.
    pub fn head_pool(&self, tail: u32, relation: u32) -> Result<&[u32]> {
        self.head_pools
            .get(&(tail, relation))
            .map(Vec::as_slice)
            .ok_or(Error::CacheMiss {
                entity: tail,
                relation,
            })
    }

    /// Substitute tails for facts starting at `head` under `relation`.
    pub fn tail_pool(&self, head: u32, relation: u32) -> Result<&[u32]> {
        self.tail_pools
            .get(&(head, relation))
            .map(Vec::as_slice)
            .ok_or(Error::CacheMiss {
                entity: head,
                relation,
            })
    }

    pub fn cache_dim(&self) -> usize {
        self.cache_dim
    }

    pub fn n_head_keys(&self) -> usize {
        self.head_pools.len()
    }

    pub fn n_tail_keys(&self) -> usize {
        self.tail_pools.len()
    }
}

/// Entities in `[0, n_ent)` outside `known`.
fn unknown(known: Option<&HashSet<u32>>, n_ent: u32) -> Vec<u32> {
    (0..n_ent)
        .filter(|e| !known.is_some_and(|k| k.contains(e)))
        .collect()
}

/// Candidates whose rounded score is not the relation id.
fn incompatible(candidates: &[u32], scores: &[f32], relation: u32) -> Vec<u32> {
    candidates
        .iter()
        .zip(scores)
        .filter(|(_, s)| s.round() as i64 != i64::from(relation))
        .map(|(&e, _)| e)
        .collect()
}

/// `cache_dim` draws with replacement, uniform over `[0, n_ent)` if `kept` is empty.
fn draw_pool(kept: &[u32], cache_dim: usize, n_ent: u32, rng: &mut StdRng) -> Vec<u32> {
    (0..cache_dim)
        .map(|_| {
            if kept.is_empty() {
                rng.random_range(0..n_ent)
            } else {
                kept[rng.random_range(0..kept.len())]
            }
        })
        .collect()
}

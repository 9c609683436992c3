//! Batch corruption policies.
//!
//! Every sampler takes a batch of true triplets and returns, for each of
//! `n_neg` repetitions of the batch, a copy in which either the head or the
//! tail has been replaced. Relations are never altered and not returned.
//!
//! # Output layout
//!
//! ```text
//! position k * batch_size + j  <-  repetition k of triplet j
//! ```
//!
//! # Policies
//!
//! | Sampler | Head or tail? | Replacement drawn from |
//! |---------|---------------|------------------------|
//! | [`UniformSampler`] | fair coin | `[1, n_ent)` |
//! | [`BernoulliSampler`] | relation's TransH probability | `[1, n_ent)` |
//! | [`PositionalSampler`] | relation's TransH probability | entities seen in that position of that relation |
//! | [`crate::MfSampler`] | relation's TransH probability | learned candidate cache |
//!
//! Entity id 0 is reserved and never drawn by the uniform policies. None of
//! the policies reject a replacement that happens to recreate a true fact.

mod bernoulli;
mod positional;
mod uniform;

pub use bernoulli::BernoulliSampler;
pub use positional::PositionalSampler;
pub use uniform::UniformSampler;

use crate::batch::{ids_to_vec, TripletBatch};
use crate::error::{Error, Result};
use crate::graph::Fact;
use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Uniform;

/// A negative sampling policy.
pub trait NegativeSampler {
    /// Corrupt a batch `n_neg` times.
    ///
    /// `heads`, `tails` and `relations` must be rank-1 integer tensors of
    /// equal length on one device. Returns `(neg_heads, neg_tails)`, each of
    /// length `batch_size * n_neg`, as `u32` tensors on the input device.
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)>;

    /// Negatives per fact used by [`NegativeSampler::corrupt`].
    fn n_neg(&self) -> usize;

    /// Corrupt a batch with the configured number of negatives.
    fn corrupt(&mut self, batch: &TripletBatch) -> Result<(Tensor, Tensor)> {
        let n_neg = self.n_neg();
        self.corrupt_batch(&batch.heads, &batch.tails, &batch.relations, n_neg)
    }

    /// Policy name, for logs.
    fn name(&self) -> &'static str;
}

impl<S: NegativeSampler + ?Sized> NegativeSampler for Box<S> {
    fn corrupt_batch(
        &mut self,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
        n_neg: usize,
    ) -> Result<(Tensor, Tensor)> {
        (**self).corrupt_batch(heads, tails, relations, n_neg)
    }

    fn n_neg(&self) -> usize {
        (**self).n_neg()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// A validated batch read back to host.
pub(crate) struct HostBatch {
    pub heads: Vec<u32>,
    pub tails: Vec<u32>,
    pub relations: Vec<u32>,
    pub device: Device,
}

impl HostBatch {
    /// Check the batch preconditions and copy ids to host.
    pub fn read(heads: &Tensor, tails: &Tensor, relations: &Tensor, n_neg: usize) -> Result<Self> {
        if n_neg == 0 {
            return Err(Error::InvalidConfig("n_neg must be at least 1".into()));
        }

        let device = heads.device();
        for (name, other) in [("tails", tails), ("relations", relations)] {
            if !device.same_device(other.device()) {
                return Err(Error::DeviceMismatch(format!(
                    "heads on {:?}, {} on {:?}",
                    device.location(),
                    name,
                    other.device().location()
                )));
            }
        }

        let batch = Self {
            heads: ids_to_vec(heads)?,
            tails: ids_to_vec(tails)?,
            relations: ids_to_vec(relations)?,
            device: device.clone(),
        };

        let n = batch.heads.len();
        for len in [batch.tails.len(), batch.relations.len()] {
            if len != n {
                return Err(Error::LengthMismatch { expected: n, got: len });
            }
        }

        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Materialise two host id buffers on the batch's device.
    pub fn to_device(&self, neg_heads: Vec<u32>, neg_tails: Vec<u32>) -> Result<(Tensor, Tensor)> {
        let n = neg_heads.len();
        Ok((
            Tensor::from_vec(neg_heads, n, &self.device)?,
            Tensor::from_vec(neg_tails, n, &self.device)?,
        ))
    }

    pub fn fact(&self, j: usize) -> Fact {
        Fact::new(self.heads[j], self.relations[j], self.tails[j])
    }

    /// Repeat the batch `n_neg` times and replace one side of every position.
    ///
    /// `head_prob(r)` is the probability of replacing the head of a triplet
    /// with relation `r`; the two `replace_*` closures draw the substitute
    /// for the original fact at that position.
    pub fn corrupt_with<P, H, T>(
        &self,
        n_neg: usize,
        rng: &mut StdRng,
        head_prob: P,
        mut replace_head: H,
        mut replace_tail: T,
    ) -> Result<(Vec<u32>, Vec<u32>)>
    where
        P: Fn(u32) -> f64,
        H: FnMut(&mut StdRng, Fact) -> Result<u32>,
        T: FnMut(&mut StdRng, Fact) -> Result<u32>,
    {
        let batch_size = self.len();
        let mut neg_heads = self.heads.repeat(n_neg);
        let mut neg_tails = self.tails.repeat(n_neg);

        for pos in 0..batch_size * n_neg {
            let fact = self.fact(pos % batch_size);
            if rng.random_bool(head_prob(fact.relation).clamp(0.0, 1.0)) {
                neg_heads[pos] = replace_head(rng, fact)?;
            } else {
                neg_tails[pos] = replace_tail(rng, fact)?;
            }
        }

        Ok((neg_heads, neg_tails))
    }
}

/// Uniform draws over `[1, n_ent)`, skipping the reserved id 0.
pub(crate) fn nonzero_entities(n_ent: usize) -> Result<Uniform<u32>> {
    let upper = u32::try_from(n_ent)
        .map_err(|_| Error::InvalidConfig(format!("n_ent {} does not fit in u32", n_ent)))?;
    Uniform::new(1, upper).map_err(|_| {
        Error::InvalidConfig(format!(
            "need at least 2 entities to draw replacements, got {}",
            n_ent
        ))
    })
}

#[cfg(test)]
pub(crate) mod test_util {
    use candle_core::{Device, Tensor};

    pub fn ids(values: &[u32]) -> Tensor {
        Tensor::new(values, &Device::Cpu).unwrap()
    }

    /// Fraction of positions whose head differs from the repeated original.
    pub fn head_change_rate(orig_heads: &[u32], neg_heads: &Tensor) -> f64 {
        let neg = neg_heads.to_vec1::<u32>().unwrap();
        let changed = neg
            .iter()
            .enumerate()
            .filter(|&(i, &h)| h != orig_heads[i % orig_heads.len()])
            .count();
        changed as f64 / neg.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::ids;
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_read_rejects_length_mismatch() {
        let err = HostBatch::read(&ids(&[1, 2]), &ids(&[3, 4]), &ids(&[0]), 1).err().unwrap();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_read_rejects_zero_n_neg() {
        let err = HostBatch::read(&ids(&[1]), &ids(&[2]), &ids(&[0]), 0).err().unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_corrupt_with_layout() {
        let batch = HostBatch::read(&ids(&[1, 2, 3]), &ids(&[4, 5, 6]), &ids(&[0, 1, 0]), 2).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        // always replace the head with 100 + relation
        let (h, t) = batch
            .corrupt_with(2, &mut rng, |_| 1.0, |_, f| Ok(100 + f.relation), |_, _| Ok(0))
            .unwrap();
        assert_eq!(h, vec![100, 101, 100, 100, 101, 100]);
        assert_eq!(t, vec![4, 5, 6, 4, 5, 6]);

        // always replace the tail
        let (h, t) = batch
            .corrupt_with(2, &mut rng, |_| 0.0, |_, _| Ok(0), |_, f| Ok(200 + f.relation))
            .unwrap();
        assert_eq!(h, vec![1, 2, 3, 1, 2, 3]);
        assert_eq!(t, vec![200, 201, 200, 200, 201, 200]);
    }

    #[test]
    fn test_corrupt_with_propagates_errors() {
        let batch = HostBatch::read(&ids(&[1]), &ids(&[2]), &ids(&[0]), 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = batch.corrupt_with(
            1,
            &mut rng,
            |_| 1.0,
            |_, f| Err(Error::CacheMiss { entity: f.tail, relation: f.relation }),
            |_, _| Ok(0),
        );
        assert!(matches!(result, Err(Error::CacheMiss { entity: 2, relation: 0 })));
    }

    #[test]
    fn test_nonzero_entities_bounds() {
        assert!(nonzero_entities(1).is_err());
        assert!(nonzero_entities(2).is_ok());
    }
}

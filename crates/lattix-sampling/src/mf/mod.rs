//! Learned candidate cache.
//!
//! A small factorization model is fit to the training graph once, then used
//! to precompute, for every `(entity, relation)` key in the graph, a pool of
//! entities the model considers incompatible with that relation. Sampling is
//! a cache lookup; the model is never consulted again.
//!
//! ```text
//! MfModel::train ──> CandidateCache::build ──> MfSampler::corrupt_batch
//!   (n_iter passes)    (write-once pools)        (pool draws + Bernoulli side)
//! ```

mod cache;
mod model;
mod sampler;

pub use cache::CandidateCache;
pub use model::MfModel;
pub use sampler::MfSampler;

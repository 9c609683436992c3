// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]

//! Negative sampling for knowledge graph embedding training.
//!
//! KGE models learn by contrasting true facts with corrupted ones. Given a
//! batch `(h, r, t)`, a sampler returns copies in which the head or the tail
//! has been swapped for another entity:
//!
//! ```text
//! (Paris, capital_of, France)  ->  (Berlin, capital_of, France)   head corrupted
//!                              ->  (Paris, capital_of, Japan)     tail corrupted
//! ```
//!
//! # Samplers
//!
//! | Sampler | Side choice | Substitute | Cost to build |
//! |---------|-------------|------------|---------------|
//! | [`UniformSampler`] | fair coin | uniform entity | none |
//! | [`BernoulliSampler`] | per-relation `tph / (tph + hpt)` | uniform entity | one graph scan |
//! | [`PositionalSampler`] | per-relation `tph / (tph + hpt)` | entity seen in that slot | one graph scan |
//! | [`MfSampler`] | per-relation `tph / (tph + hpt)` | learned candidate pool | model training + cache build |
//!
//! Uniform corruption is cheap but produces easy negatives and, on
//! one-to-many relations, many false negatives. The Bernoulli trick (Wang et
//! al. 2014) corrupts the side with more valid alternatives less often.
//! Positional sampling keeps substitutes type-plausible. The learned cache
//! goes one step further and prefers entities a small model rates as
//! incompatible with the relation.
//!
//! # Example
//!
//! ```rust
//! use lattix_sampling::{BernoulliSampler, KnowledgeGraph, NegativeSampler, SamplerConfig, TripletBatch};
//! use candle_core::Device;
//!
//! let kg = KnowledgeGraph::new(10, 2, [(1u32, 0u32, 2u32), (1, 0, 3), (4, 1, 5)]).unwrap();
//! let mut sampler = BernoulliSampler::new(&kg, &SamplerConfig::default().with_seed(7)).unwrap();
//!
//! let batch = TripletBatch::from_slices(&[1, 4], &[2, 5], &[0, 1], &Device::Cpu).unwrap();
//! let (neg_heads, neg_tails) = sampler.corrupt_batch(&batch.heads, &batch.tails, &batch.relations, 3).unwrap();
//! assert_eq!(neg_heads.dims(), &[6]);
//! assert_eq!(neg_tails.dims(), &[6]);
//! ```
//!
//! # Randomness
//!
//! Every sampler owns a `StdRng` seeded from [`SamplerConfig::seed`] (or OS
//! entropy). Draws happen on the host; outputs are new tensors on the input
//! device. Inputs are never modified.
//!
//! # References
//!
//! - Wang et al. (2014). "Knowledge Graph Embedding by Translating on Hyperplanes." AAAI.
//! - Bordes et al. (2013). "Translating Embeddings for Modeling Multi-relational Data." NeurIPS.

pub mod batch;
pub mod config;
pub mod corrupt;
pub mod error;
pub mod graph;
pub mod loss;
pub mod mf;
pub mod possibility;
pub mod sampler;
pub mod stage;
pub mod stats;

pub use batch::{BatchLoader, Placement, TripletBatch};
pub use config::{MfConfig, SamplerConfig};
pub use corrupt::GraphCorruptor;
pub use error::{Error, Result};
pub use graph::{Fact, KnowledgeGraph, Split};
pub use loss::{logistic_loss, margin_loss};
pub use mf::{CandidateCache, MfModel, MfSampler};
pub use possibility::PossibilityIndex;
pub use sampler::{BernoulliSampler, NegativeSampler, PositionalSampler, UniformSampler};
pub use stage::StageWriter;
pub use stats::{RelationStatistics, DEFAULT_PROBABILITY};

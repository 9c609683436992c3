//! Sampler configuration.
//!
//! Both configs are plain data with builder-style setters and serde support,
//! so they can be embedded in a larger training config file:
//!
//! ```rust
//! use lattix_sampling::{MfConfig, SamplerConfig};
//!
//! let sampler = SamplerConfig::default().with_n_neg(5).with_seed(7);
//! assert_eq!(sampler.n_neg, 5);
//!
//! let mf = MfConfig::from_json(r#"{ "n_factors": 8, "n_iter": 10 }"#).unwrap();
//! assert_eq!(mf.n_factors, 8);
//! assert_eq!(mf.cache_dim, 50);
//! ```

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Configuration shared by every negative sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Negatives produced per fact when the caller does not override it (default: 1).
    pub n_neg: usize,
    /// Random seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { n_neg: 1, seed: None }
    }
}

impl SamplerConfig {
    pub fn with_n_neg(mut self, n_neg: usize) -> Self {
        self.n_neg = n_neg;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_neg == 0 {
            return Err(Error::InvalidConfig("n_neg must be at least 1".into()));
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Configuration of the factorization sub-model behind [`crate::MfSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfConfig {
    /// Latent factors per entity role (default: 20).
    pub n_factors: usize,
    /// Candidates kept per (entity, relation) key (default: 50).
    pub cache_dim: usize,
    /// Full passes over the graph during training (default: 1000).
    pub n_iter: usize,
    /// Training batch size (default: 10000).
    pub batch_size: usize,
    /// Adam learning rate (default: 0.001).
    pub learning_rate: f64,
    /// Decoupled weight decay; 0.0 is plain Adam (default: 0.0).
    pub weight_decay: f64,
    /// Embeddings start uniform in `[0, init_scale)` (default: 0.0005).
    pub init_scale: f64,
    /// Train on CUDA device 0 when available (default: false).
    pub use_accelerator: bool,
}

impl Default for MfConfig {
    fn default() -> Self {
        Self {
            n_factors: 20,
            cache_dim: 50,
            n_iter: 1000,
            batch_size: 10_000,
            learning_rate: 0.001,
            weight_decay: 0.0,
            init_scale: 0.0005,
            use_accelerator: false,
        }
    }
}

impl MfConfig {
    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    pub fn with_cache_dim(mut self, cache_dim: usize) -> Self {
        self.cache_dim = cache_dim;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_init_scale(mut self, init_scale: f64) -> Self {
        self.init_scale = init_scale;
        self
    }

    pub fn with_accelerator(mut self, use_accelerator: bool) -> Self {
        self.use_accelerator = use_accelerator;
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_factors == 0 {
            return Err(Error::InvalidConfig("n_factors must be at least 1".into()));
        }
        if self.cache_dim == 0 {
            return Err(Error::InvalidConfig("cache_dim must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.init_scale.is_nan() || self.init_scale <= 0.0 {
            return Err(Error::InvalidConfig("init_scale must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_config_builder() {
        let config = SamplerConfig::default().with_n_neg(3).with_seed(11);
        assert_eq!(config.n_neg, 3);
        assert_eq!(config.seed, Some(11));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampler_config_rejects_zero_n_neg() {
        let result = SamplerConfig::from_json(r#"{ "n_neg": 0 }"#);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_mf_config_defaults() {
        let config = MfConfig::default();
        assert_eq!(config.n_factors, 20);
        assert_eq!(config.cache_dim, 50);
        assert_eq!(config.n_iter, 1000);
        assert_eq!(config.batch_size, 10_000);
        assert!((config.learning_rate - 0.001).abs() < 1e-12);
        assert!(!config.use_accelerator);
    }

    #[test]
    fn test_mf_config_init_scale() {
        let config = MfConfig::default().with_init_scale(0.01);
        assert!((config.init_scale - 0.01).abs() < 1e-12);
        assert!(config.validate().is_ok());

        let config = MfConfig::default().with_init_scale(0.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_mf_config_json_partial() {
        let config = MfConfig::from_json(r#"{ "cache_dim": 4, "use_accelerator": true }"#).unwrap();
        assert_eq!(config.cache_dim, 4);
        assert!(config.use_accelerator);
        assert_eq!(config.n_factors, 20);
    }

    #[test]
    fn test_mf_config_bad_json() {
        let result = MfConfig::from_json("{ n_factors: ");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_same_seed_same_stream() {
        use rand::Rng;

        let config = SamplerConfig::default().with_seed(5);
        let mut first = config.rng();
        let mut second = config.rng();
        let a: Vec<u32> = (0..8).map(|_| first.random_range(0..100)).collect();
        let b: Vec<u32> = (0..8).map(|_| second.random_range(0..100)).collect();
        assert_eq!(a, b);
    }
}

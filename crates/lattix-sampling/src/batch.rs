//! Fixed-size triplet batches over a [`KnowledgeGraph`].
//!
//! # Placement
//!
//! | Variant | Where batches live | Upload cost |
//! |---------|--------------------|-------------|
//! | [`Placement::Host`] | CPU | none |
//! | [`Placement::PerBatch`] | target device | one copy per batch |
//! | [`Placement::Resident`] | target device | whole graph once, then views |
//!
//! `Resident` suits repeated passes over a graph that fits in device memory
//! (the factorization sub-model trains this way); `PerBatch` suits one-off
//! sweeps such as corrupting a whole split.

use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use candle_core::{DType, Device, Tensor};

/// Three equal-length rank-1 id tensors on one device.
#[derive(Debug, Clone)]
pub struct TripletBatch {
    pub heads: Tensor,
    pub tails: Tensor,
    pub relations: Tensor,
}

impl TripletBatch {
    /// Build a batch from host slices on `device`.
    pub fn from_slices(heads: &[u32], tails: &[u32], relations: &[u32], device: &Device) -> Result<Self> {
        let n = heads.len();
        for len in [tails.len(), relations.len()] {
            if len != n {
                return Err(Error::LengthMismatch { expected: n, got: len });
            }
        }

        Ok(Self {
            heads: Tensor::from_slice(heads, n, device)?,
            tails: Tensor::from_slice(tails, n, device)?,
            relations: Tensor::from_slice(relations, n, device)?,
        })
    }

    pub fn len(&self) -> usize {
        self.heads.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn device(&self) -> &Device {
        self.heads.device()
    }
}

/// Where a [`BatchLoader`] materialises its batches.
#[derive(Debug, Clone)]
pub enum Placement {
    Host,
    PerBatch(Device),
    Resident(Device),
}

/// Iterates a graph's facts in storage order, `batch_size` at a time.
pub struct BatchLoader<'a> {
    kg: &'a KnowledgeGraph,
    batch_size: usize,
    source: Source,
}

impl<'a> BatchLoader<'a> {
    pub fn new(kg: &'a KnowledgeGraph, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        Ok(Self {
            kg,
            batch_size,
            source: Source::Slices(Device::Cpu),
        })
    }

    /// Choose where batches live.
    ///
    /// With [`Placement::Resident`] this is where the full arrays are uploaded.
    pub fn with_placement(mut self, placement: Placement) -> Result<Self> {
        self.source = match placement {
            Placement::Host => Source::Slices(Device::Cpu),
            Placement::PerBatch(device) => Source::Slices(device),
            Placement::Resident(device) => {
                let n = self.kg.n_facts();
                Source::Resident(TripletBatch {
                    heads: Tensor::from_slice(self.kg.head_idx(), n, &device)?,
                    tails: Tensor::from_slice(self.kg.tail_idx(), n, &device)?,
                    relations: Tensor::from_slice(self.kg.relations(), n, &device)?,
                })
            }
        };
        Ok(self)
    }

    /// Number of batches one pass yields.
    pub fn num_batches(&self) -> usize {
        self.kg.n_facts().div_ceil(self.batch_size)
    }

    /// Start a pass over the graph.
    pub fn iter(&self) -> Batches<'_> {
        Batches {
            loader: self,
            offset: 0,
        }
    }
}

enum Source {
    Slices(Device),
    Resident(TripletBatch),
}

/// One pass of a [`BatchLoader`].
pub struct Batches<'a> {
    loader: &'a BatchLoader<'a>,
    offset: usize,
}

impl Batches<'_> {
    fn batch(&self, start: usize, len: usize) -> Result<TripletBatch> {
        let kg = self.loader.kg;
        match &self.loader.source {
            Source::Slices(device) => {
                let end = start + len;
                TripletBatch::from_slices(
                    &kg.head_idx()[start..end],
                    &kg.tail_idx()[start..end],
                    &kg.relations()[start..end],
                    device,
                )
            }
            Source::Resident(all) => Ok(TripletBatch {
                heads: all.heads.narrow(0, start, len)?,
                tails: all.tails.narrow(0, start, len)?,
                relations: all.relations.narrow(0, start, len)?,
            }),
        }
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<TripletBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.loader.kg.n_facts();
        if self.offset >= n {
            return None;
        }
        let len = self.loader.batch_size.min(n - self.offset);
        let start = self.offset;
        self.offset += len;
        Some(self.batch(start, len))
    }
}

/// Read a rank-1 integer id tensor back to host ids.
///
/// Accepts `u8`, `u32` and `i64`; negative or oversized `i64` ids are errors.
pub(crate) fn ids_to_vec(ids: &Tensor) -> Result<Vec<u32>> {
    if ids.rank() != 1 {
        return Err(Error::Shape(ids.dims().to_vec()));
    }
    match ids.dtype() {
        DType::U32 => Ok(ids.to_vec1::<u32>()?),
        DType::U8 => Ok(ids.to_vec1::<u8>()?.into_iter().map(u32::from).collect()),
        DType::I64 => ids
            .to_vec1::<i64>()?
            .into_iter()
            .map(|id| u32::try_from(id).map_err(|_| Error::IdOutOfRange(id)))
            .collect(),
        other => Err(Error::IdDType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph(n: u32) -> KnowledgeGraph {
        KnowledgeGraph::from_facts((0..n).map(|i| (i, i % 2, i + 1)))
    }

    #[test]
    fn test_batches_cover_all_facts() {
        let kg = chain_graph(10);
        let loader = BatchLoader::new(&kg, 3).unwrap();
        assert_eq!(loader.num_batches(), 4);

        let batches: Vec<TripletBatch> = loader.iter().map(|b| b.unwrap()).collect();
        let sizes: Vec<usize> = batches.iter().map(TripletBatch::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let heads: Vec<u32> = batches
            .iter()
            .flat_map(|b| b.heads.to_vec1::<u32>().unwrap())
            .collect();
        assert_eq!(heads, kg.head_idx());
    }

    #[test]
    fn test_resident_matches_host() {
        let kg = chain_graph(7);
        let host = BatchLoader::new(&kg, 4).unwrap();
        let resident = BatchLoader::new(&kg, 4)
            .unwrap()
            .with_placement(Placement::Resident(Device::Cpu))
            .unwrap();

        // a resident loader serves any number of passes from one upload
        for _ in 0..2 {
            assert_eq!(resident.iter().count(), 2);
        }
        for (a, b) in host.iter().zip(resident.iter()) {
            let (a, b) = (a.unwrap(), b.unwrap());
            assert_eq!(a.tails.to_vec1::<u32>().unwrap(), b.tails.to_vec1::<u32>().unwrap());
            assert_eq!(
                a.relations.to_vec1::<u32>().unwrap(),
                b.relations.to_vec1::<u32>().unwrap()
            );
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let kg = chain_graph(3);
        assert!(matches!(BatchLoader::new(&kg, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_slices_length_mismatch() {
        let err = TripletBatch::from_slices(&[1, 2], &[3], &[0, 0], &Device::Cpu).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_ids_to_vec_converts_i64() {
        let ids = Tensor::new(&[4i64, 0, 9], &Device::Cpu).unwrap();
        assert_eq!(ids_to_vec(&ids).unwrap(), vec![4, 0, 9]);

        let matrix = Tensor::zeros((2, 2), DType::U32, &Device::Cpu).unwrap();
        assert!(matches!(ids_to_vec(&matrix), Err(Error::Shape(_))));
    }

    #[test]
    fn test_ids_to_vec_converts_u8() {
        let ids = Tensor::new(&[3u8, 255], &Device::Cpu).unwrap();
        assert_eq!(ids_to_vec(&ids).unwrap(), vec![3, 255]);
    }

    #[test]
    fn test_ids_to_vec_rejects_floats() {
        let ids = Tensor::new(&[1.7f32, 2.2], &Device::Cpu).unwrap();
        assert!(matches!(ids_to_vec(&ids), Err(Error::IdDType(DType::F32))));
    }

    #[test]
    fn test_ids_to_vec_rejects_out_of_range_i64() {
        let ids = Tensor::new(&[-1i64, 2], &Device::Cpu).unwrap();
        assert!(matches!(ids_to_vec(&ids), Err(Error::IdOutOfRange(-1))));

        let ids = Tensor::new(&[1i64 << 32], &Device::Cpu).unwrap();
        assert!(matches!(ids_to_vec(&ids), Err(Error::IdOutOfRange(_))));
    }
}

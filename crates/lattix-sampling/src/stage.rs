//! CSV dump of intermediate triplets, for inspecting training stages.
//!
//! Rows are `head,tail,relation` with no header, appended to
//! `{dir}/{prefix}{stage}_{epoch}.csv`.

use crate::batch::ids_to_vec;
use crate::error::{Error, Result};
use candle_core::Tensor;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StageWriter {
    dir: PathBuf,
    prefix: String,
}

impl StageWriter {
    pub fn new(dir: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.into(),
        }
    }

    pub fn path(&self, stage: &str, epoch: usize) -> PathBuf {
        self.dir.join(format!("{}{}_{}.csv", self.prefix, stage, epoch))
    }

    /// Append one row per triplet, creating the file if needed.
    pub fn append(
        &self,
        stage: &str,
        epoch: usize,
        heads: &Tensor,
        tails: &Tensor,
        relations: &Tensor,
    ) -> Result<PathBuf> {
        let heads = ids_to_vec(heads)?;
        let tails = ids_to_vec(tails)?;
        let relations = ids_to_vec(relations)?;
        for len in [tails.len(), relations.len()] {
            if len != heads.len() {
                return Err(Error::LengthMismatch {
                    expected: heads.len(),
                    got: len,
                });
            }
        }

        let path = self.path(stage, epoch);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        for ((h, t), r) in heads.iter().zip(&tails).zip(&relations) {
            writer.write_record(&[h.to_string(), t.to_string(), r.to_string()])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

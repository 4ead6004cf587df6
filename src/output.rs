//! Output serialization.
//!
//! One output row is written per posterior sample (row 0 holds the
//! maximum-posterior state from the optimization rounds). The on-disk layer
//! is behind [`OutputStore`]: the coordinator declares the dataset layout up
//! front, then streams rows into it. Store implementations are free to chunk
//! and compress as they see fit; the reference on-disk layout chunks the
//! quantification dataset per `(sample, row)` slab with deflate. [`MemStore`]
//! keeps everything in memory and serializes to JSON for inspection and
//! tests.
//!
//! Dataset layout:
//!
//! | path | shape | content |
//! |---|---|---|
//! | `/transcript_id`, `/gene_id`, `/gene_name` | `[N]` | annotation strings |
//! | `/tgroup` | `[N]` | tgroup id per transcript |
//! | `/transcript_quantification` | `[S, K, N]` | abundance matrix per row |
//! | `/sample_scaling` | `[S, K]` | per-sample scales |
//! | `/experiment/mean` | `[S, N]` | experiment means |
//! | `/experiment/splice_mu` | `[S, J]` vlen | experiment splice means |
//! | `/experiment/splice_sigma` | `[S, J]` vlen | experiment splice scale |
//! | `/condition/mean` | `[S, C, N]` | condition means |
//! | `/condition/shape` | `[S, N]` | condition shapes |
//! | `/condition/splice_mu` | `[S, C, J]` vlen | condition splice means |
//! | `/condition/splice_sigma` | `[S, J]` vlen | condition splice sigmas |

use std::collections::BTreeMap;

use serde::Serialize;

use crate::design::{Design, TranscriptInfo};
use crate::error::{assert_finite32, Error, Result};
use crate::state::ParamState;

/// Destination for the sampler's datasets.
pub trait OutputStore {
    /// Write a variable-length string column.
    fn put_str_column(&mut self, path: &str, values: &[String]) -> Result<()>;

    /// Write a `u32` column.
    fn put_u32_column(&mut self, path: &str, values: &[u32]) -> Result<()>;

    /// Declare a fixed-shape `f32` dataset; `dims[0]` is the row dimension.
    fn create_fixed(&mut self, path: &str, dims: &[usize]) -> Result<()>;

    /// Write one row of a fixed-shape dataset, flattened row-major.
    fn write_row(&mut self, path: &str, row: usize, values: &[f32]) -> Result<()>;

    /// Declare a variable-length `f32` dataset. `dims[0]` is the row
    /// dimension; the trailing dimension indexes `lens`, the per-entry
    /// group lengths.
    fn create_vlen(&mut self, path: &str, dims: &[usize], lens: &[usize]) -> Result<()>;

    /// Write one row of a variable-length dataset: one group per entry of
    /// the flattened non-row dimensions.
    fn write_vlen_row(&mut self, path: &str, row: usize, groups: &[Vec<f32>]) -> Result<()>;
}

#[derive(Debug, Serialize)]
enum Dataset {
    Str(Vec<String>),
    U32(Vec<u32>),
    Fixed {
        dims: Vec<usize>,
        rows: Vec<Vec<f32>>,
    },
    Vlen {
        dims: Vec<usize>,
        lens: Vec<usize>,
        rows: Vec<Vec<Vec<f32>>>,
    },
}

/// In-memory [`OutputStore`].
#[derive(Debug, Default, Serialize)]
pub struct MemStore {
    datasets: BTreeMap<String, Dataset>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every dataset written so far.
    pub fn paths(&self) -> Vec<&str> {
        self.datasets.keys().map(String::as_str).collect()
    }

    /// A string column, if present.
    pub fn str_column(&self, path: &str) -> Option<&[String]> {
        match self.datasets.get(path) {
            Some(Dataset::Str(values)) => Some(values),
            _ => None,
        }
    }

    /// A `u32` column, if present.
    pub fn u32_column(&self, path: &str) -> Option<&[u32]> {
        match self.datasets.get(path) {
            Some(Dataset::U32(values)) => Some(values),
            _ => None,
        }
    }

    /// Shape and rows of a fixed dataset, if present.
    pub fn fixed(&self, path: &str) -> Option<(&[usize], &[Vec<f32>])> {
        match self.datasets.get(path) {
            Some(Dataset::Fixed { dims, rows }) => Some((dims, rows)),
            _ => None,
        }
    }

    /// Shape, group lengths, and rows of a variable-length dataset.
    pub fn vlen(&self, path: &str) -> Option<(&[usize], &[Vec<Vec<f32>>])> {
        match self.datasets.get(path) {
            Some(Dataset::Vlen { dims, rows, .. }) => Some((dims, rows)),
            _ => None,
        }
    }

    /// Serialize the whole store to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Output(e.to_string()))
    }

    fn insert(&mut self, path: &str, dataset: Dataset) -> Result<()> {
        if self.datasets.contains_key(path) {
            return Err(Error::Output(format!("dataset {path} already exists")));
        }
        self.datasets.insert(path.to_string(), dataset);
        Ok(())
    }
}

impl OutputStore for MemStore {
    fn put_str_column(&mut self, path: &str, values: &[String]) -> Result<()> {
        self.insert(path, Dataset::Str(values.to_vec()))
    }

    fn put_u32_column(&mut self, path: &str, values: &[u32]) -> Result<()> {
        self.insert(path, Dataset::U32(values.to_vec()))
    }

    fn create_fixed(&mut self, path: &str, dims: &[usize]) -> Result<()> {
        self.insert(
            path,
            Dataset::Fixed {
                dims: dims.to_vec(),
                rows: Vec::new(),
            },
        )
    }

    fn write_row(&mut self, path: &str, row: usize, values: &[f32]) -> Result<()> {
        match self.datasets.get_mut(path) {
            Some(Dataset::Fixed { dims, rows }) => {
                let row_len: usize = dims[1..].iter().product();
                if values.len() != row_len {
                    return Err(Error::Output(format!(
                        "{path}: row length {} does not match shape {dims:?}",
                        values.len()
                    )));
                }
                if row != rows.len() || row >= dims[0] {
                    return Err(Error::Output(format!("{path}: unexpected row index {row}")));
                }
                rows.push(values.to_vec());
                Ok(())
            }
            _ => Err(Error::Output(format!("{path}: no such fixed dataset"))),
        }
    }

    fn create_vlen(&mut self, path: &str, dims: &[usize], lens: &[usize]) -> Result<()> {
        self.insert(
            path,
            Dataset::Vlen {
                dims: dims.to_vec(),
                lens: lens.to_vec(),
                rows: Vec::new(),
            },
        )
    }

    fn write_vlen_row(&mut self, path: &str, row: usize, groups: &[Vec<f32>]) -> Result<()> {
        match self.datasets.get_mut(path) {
            Some(Dataset::Vlen { dims, lens, rows }) => {
                let num_groups: usize = dims[1..].iter().product();
                if groups.len() != num_groups {
                    return Err(Error::Output(format!(
                        "{path}: {} groups do not match shape {dims:?}",
                        groups.len()
                    )));
                }
                if !lens.is_empty() {
                    for (g, group) in groups.iter().enumerate() {
                        let expected = lens[g % lens.len()];
                        if group.len() != expected {
                            return Err(Error::Output(format!(
                                "{path}: group {g} has length {} instead of {expected}",
                                group.len()
                            )));
                        }
                    }
                }
                if row != rows.len() || row >= dims[0] {
                    return Err(Error::Output(format!("{path}: unexpected row index {row}")));
                }
                rows.push(groups.to_vec());
                Ok(())
            }
            _ => Err(Error::Output(format!("{path}: no such vlen dataset"))),
        }
    }
}

/// Flattens sampler state into output rows.
pub struct OutputWriter {
    num_rows: usize,
}

impl OutputWriter {
    /// Declare the full dataset layout and write the transcript metadata.
    pub fn setup(
        store: &mut dyn OutputStore,
        design: &Design,
        info: &TranscriptInfo,
        num_rows: usize,
    ) -> Result<Self> {
        let n = design.num_transcripts();
        let k = design.num_samples();
        let c = design.num_conditions();
        let j = design.num_spliced();

        store.put_str_column("/transcript_id", &info.transcript_id)?;
        store.put_str_column("/gene_id", &info.gene_id)?;
        store.put_str_column("/gene_name", &info.gene_name)?;
        let tgroups: Vec<u32> = (0..n).map(|tid| design.tgroup_of(tid)).collect();
        store.put_u32_column("/tgroup", &tgroups)?;

        store.create_fixed("/transcript_quantification", &[num_rows, k, n])?;
        store.create_fixed("/sample_scaling", &[num_rows, k])?;
        store.create_fixed("/experiment/mean", &[num_rows, n])?;
        store.create_fixed("/condition/mean", &[num_rows, c, n])?;
        store.create_fixed("/condition/shape", &[num_rows, n])?;

        let lens: Vec<usize> = (0..j).map(|jj| design.splice_members(jj).len()).collect();
        store.create_vlen("/experiment/splice_mu", &[num_rows, j], &lens)?;
        store.create_vlen("/experiment/splice_sigma", &[num_rows, j], &lens)?;
        store.create_vlen("/condition/splice_mu", &[num_rows, c, j], &lens)?;
        store.create_vlen("/condition/splice_sigma", &[num_rows, j], &lens)?;

        Ok(Self { num_rows })
    }

    /// Write one posterior sample.
    ///
    /// Runs on the coordinator thread between fan-outs, when no worker is
    /// writing state. Every value is checked finite on the way out.
    pub fn write_row(
        &self,
        store: &mut dyn OutputStore,
        row: usize,
        state: &ParamState,
        design: &Design,
    ) -> Result<()> {
        debug_assert!(row < self.num_rows);
        let j = design.num_spliced();
        let c = design.num_conditions();

        // SAFETY: coordinator-only phase; no fan-out is in flight.
        let q = unsafe { state.q.to_vec() };
        let scale = unsafe { state.scale.to_vec() };
        let experiment_mean = unsafe { state.experiment_mean.to_vec() };
        let condition_mean = unsafe { state.condition_mean.to_vec() };
        let condition_shape = unsafe { state.condition_shape.to_vec() };
        let experiment_splice_mu = unsafe { state.experiment_splice_mu.to_vec() };
        let condition_splice_mu = unsafe { state.condition_splice_mu.to_vec() };
        let condition_splice_sigma = unsafe { state.condition_splice_sigma.to_vec() };

        for buf in [
            &q,
            &scale,
            &experiment_mean,
            &condition_mean,
            &condition_shape,
            &experiment_splice_mu,
            &condition_splice_mu,
            &condition_splice_sigma,
        ] {
            for &x in buf {
                assert_finite32(x);
            }
        }

        store.write_row("/transcript_quantification", row, &q)?;
        store.write_row("/sample_scaling", row, &scale)?;
        store.write_row("/experiment/mean", row, &experiment_mean)?;
        store.write_row("/condition/mean", row, &condition_mean)?;
        store.write_row("/condition/shape", row, &condition_shape)?;

        let slice_groups = |flat: &[f32]| -> Vec<Vec<f32>> {
            (0..j)
                .map(|jj| {
                    let offset = design.splice_offset(jj);
                    let len = design.splice_members(jj).len();
                    flat[offset..offset + len].to_vec()
                })
                .collect()
        };

        store.write_vlen_row("/experiment/splice_mu", row, &slice_groups(&experiment_splice_mu))?;

        let esplice_sigma = state.experiment_splice_sigma.get() as f32;
        assert_finite32(esplice_sigma);
        let sigma_groups: Vec<Vec<f32>> = (0..j)
            .map(|jj| vec![esplice_sigma; design.splice_members(jj).len()])
            .collect();
        store.write_vlen_row("/experiment/splice_sigma", row, &sigma_groups)?;

        let mut mu_groups = Vec::with_capacity(c * j);
        for cc in 0..c {
            for jj in 0..j {
                let offset = design.splice_offset(jj);
                let len = design.splice_members(jj).len();
                let base = state.csplice_idx(cc, offset);
                mu_groups.push(condition_splice_mu[base..base + len].to_vec());
            }
        }
        store.write_vlen_row("/condition/splice_mu", row, &mu_groups)?;

        store.write_vlen_row(
            "/condition/splice_sigma",
            row,
            &slice_groups(&condition_splice_sigma),
        )?;

        Ok(())
    }
}

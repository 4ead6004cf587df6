//! Experiment layout: samples, conditions, transcripts, and tgroups.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Immutable experiment design tables.
///
/// A *tgroup* (transcription group) is a set of transcripts whose
/// within-group proportions sum to one; only tgroups with at least two
/// members carry splicing parameters. Splice parameter buffers are flat,
/// indexed by spliced-tgroup ordinal `j` and member `k` through a
/// precomputed offset table.
#[derive(Debug, Clone)]
pub struct Design {
    condition: Vec<usize>,
    condition_samples: Vec<Vec<usize>>,
    tgroup_tids: Vec<Vec<usize>>,
    tgroup_of: Vec<u32>,
    spliced_tgroups: Vec<usize>,
    splice_offsets: Vec<usize>,
    splice_total: usize,
}

impl Design {
    /// Build and validate a design from the per-sample condition labels and
    /// the per-tgroup transcript index lists.
    pub fn new(condition: Vec<usize>, tgroup_tids: Vec<Vec<usize>>) -> Result<Self> {
        if condition.is_empty() {
            return Err(Error::InvalidDesign("no samples".into()));
        }

        let num_conditions = condition.iter().max().map_or(0, |&c| c + 1);
        let mut condition_samples = vec![Vec::new(); num_conditions];
        for (k, &c) in condition.iter().enumerate() {
            condition_samples[c].push(k);
        }
        for (c, samples) in condition_samples.iter().enumerate() {
            if samples.is_empty() {
                return Err(Error::InvalidDesign(format!("condition {c} has no samples")));
            }
        }

        let num_transcripts: usize = tgroup_tids.iter().map(Vec::len).sum();
        if num_transcripts == 0 {
            return Err(Error::InvalidDesign("no transcripts".into()));
        }
        let mut tgroup_of = vec![u32::MAX; num_transcripts];
        for (t, tids) in tgroup_tids.iter().enumerate() {
            for &tid in tids {
                if tid >= num_transcripts {
                    return Err(Error::InvalidDesign(format!(
                        "transcript index {tid} out of range"
                    )));
                }
                if tgroup_of[tid] != u32::MAX {
                    return Err(Error::InvalidDesign(format!(
                        "transcript {tid} assigned to more than one tgroup"
                    )));
                }
                tgroup_of[tid] = t as u32;
            }
        }

        let spliced_tgroups: Vec<usize> = tgroup_tids
            .iter()
            .enumerate()
            .filter(|(_, tids)| tids.len() > 1)
            .map(|(t, _)| t)
            .collect();

        let mut splice_offsets = Vec::with_capacity(spliced_tgroups.len());
        let mut splice_total = 0;
        for &t in &spliced_tgroups {
            splice_offsets.push(splice_total);
            splice_total += tgroup_tids[t].len();
        }

        Ok(Self {
            condition,
            condition_samples,
            tgroup_tids,
            tgroup_of,
            spliced_tgroups,
            splice_offsets,
            splice_total,
        })
    }

    /// Number of samples K.
    pub fn num_samples(&self) -> usize {
        self.condition.len()
    }

    /// Number of conditions C.
    pub fn num_conditions(&self) -> usize {
        self.condition_samples.len()
    }

    /// Number of transcripts N.
    pub fn num_transcripts(&self) -> usize {
        self.tgroup_of.len()
    }

    /// Number of tgroups T.
    pub fn num_tgroups(&self) -> usize {
        self.tgroup_tids.len()
    }

    /// Number of spliced tgroups J.
    pub fn num_spliced(&self) -> usize {
        self.spliced_tgroups.len()
    }

    /// Condition of sample `k`.
    pub fn condition(&self, k: usize) -> usize {
        self.condition[k]
    }

    /// Samples belonging to condition `c`.
    pub fn condition_samples(&self, c: usize) -> &[usize] {
        &self.condition_samples[c]
    }

    /// All per-condition sample lists.
    pub fn all_condition_samples(&self) -> &[Vec<usize>] {
        &self.condition_samples
    }

    /// Transcript indices of tgroup `t`.
    pub fn tgroup_tids(&self, t: usize) -> &[usize] {
        &self.tgroup_tids[t]
    }

    /// Tgroup of transcript `n`.
    pub fn tgroup_of(&self, n: usize) -> u32 {
        self.tgroup_of[n]
    }

    /// Tgroup id of spliced-tgroup ordinal `j`.
    pub fn spliced_tgroup(&self, j: usize) -> usize {
        self.spliced_tgroups[j]
    }

    /// Transcript indices of spliced-tgroup ordinal `j`.
    pub fn splice_members(&self, j: usize) -> &[usize] {
        &self.tgroup_tids[self.spliced_tgroups[j]]
    }

    /// Offset of spliced-tgroup ordinal `j` into the flat splice buffers.
    pub fn splice_offset(&self, j: usize) -> usize {
        self.splice_offsets[j]
    }

    /// Total member count across spliced tgroups (flat buffer length).
    pub fn splice_total(&self) -> usize {
        self.splice_total
    }

    /// Widest spliced tgroup, or zero when there is no splicing.
    pub fn max_splice_members(&self) -> usize {
        self.spliced_tgroups
            .iter()
            .map(|&t| self.tgroup_tids[t].len())
            .max()
            .unwrap_or(0)
    }
}

/// Per-transcript annotation written once to the output store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptInfo {
    /// Transcript identifiers.
    pub transcript_id: Vec<String>,
    /// Gene identifiers.
    pub gene_id: Vec<String>,
    /// Gene display names.
    pub gene_name: Vec<String>,
}

impl TranscriptInfo {
    /// Placeholder annotation (`t0, t1, ...`) for runs without external
    /// metadata.
    pub fn unnamed(num_transcripts: usize) -> Self {
        Self {
            transcript_id: (0..num_transcripts).map(|i| format!("t{i}")).collect(),
            gene_id: (0..num_transcripts).map(|i| format!("g{i}")).collect(),
            gene_name: (0..num_transcripts).map(|i| format!("gene{i}")).collect(),
        }
    }

    pub(crate) fn validate(&self, num_transcripts: usize) -> Result<()> {
        if self.transcript_id.len() != num_transcripts
            || self.gene_id.len() != num_transcripts
            || self.gene_name.len() != num_transcripts
        {
            return Err(Error::InvalidDesign(format!(
                "transcript annotation length does not match {num_transcripts} transcripts"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_layout_offsets() {
        // Three tgroups: sizes 1, 3, 2 -> two spliced tgroups of sizes 3, 2.
        let design = Design::new(
            vec![0, 0, 1],
            vec![vec![0], vec![1, 2, 3], vec![4, 5]],
        )
        .unwrap();
        assert_eq!(design.num_samples(), 3);
        assert_eq!(design.num_conditions(), 2);
        assert_eq!(design.num_transcripts(), 6);
        assert_eq!(design.num_spliced(), 2);
        assert_eq!(design.splice_offset(0), 0);
        assert_eq!(design.splice_offset(1), 3);
        assert_eq!(design.splice_total(), 5);
        assert_eq!(design.splice_members(1), &[4, 5]);
        assert_eq!(design.tgroup_of(2), 1);
    }

    #[test]
    fn rejects_duplicate_transcript() {
        assert!(Design::new(vec![0], vec![vec![0, 1], vec![1]]).is_err());
    }

    #[test]
    fn rejects_empty_condition() {
        // Condition 0 unused while condition 1 is present.
        assert!(Design::new(vec![1, 1], vec![vec![0]]).is_err());
    }
}

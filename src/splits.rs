use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SplitConfig;
use crate::constants::export::{EVAL_DIRNAME, TRAIN_DIRNAME};
use crate::data::FileScore;
use crate::scoring::rank;

/// Logical corpus partitions produced from ranked scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitLabel {
    /// Top-ranked files held out for evaluation.
    Eval,
    /// Remaining accepted files.
    Train,
}

impl SplitLabel {
    /// Directory name used when the split is materialized.
    pub const fn dir_name(self) -> &'static str {
        match self {
            SplitLabel::Eval => EVAL_DIRNAME,
            SplitLabel::Train => TRAIN_DIRNAME,
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Accepted files bucketed by rank.
#[derive(Clone, Debug, Default)]
pub struct CorpusSplit {
    /// Top-ranked files held out for evaluation.
    pub eval: Vec<FileScore>,
    /// Remaining accepted files.
    pub train: Vec<FileScore>,
    /// Accepted files dropped by `train_limit`.
    pub overflow: usize,
}

impl CorpusSplit {
    /// Rank `accepted` (overall desc, ties by id); the first `eval_size` go to
    /// eval, the rest (capped by `train_limit`) to train.
    pub fn bucket(mut accepted: Vec<FileScore>, config: &SplitConfig) -> Self {
        rank(&mut accepted);
        let eval_len = config.eval_size.min(accepted.len());
        let mut train = accepted.split_off(eval_len);
        let limit = config.train_limit.unwrap_or(usize::MAX);
        let overflow = train.len().saturating_sub(limit);
        train.truncate(limit);
        Self {
            eval: accepted,
            train,
            overflow,
        }
    }

    /// Files in the `label` bucket, best first.
    pub fn files(&self, label: SplitLabel) -> &[FileScore] {
        match label {
            SplitLabel::Eval => &self.eval,
            SplitLabel::Train => &self.train,
        }
    }

    /// Bucket holding `file_id`, if any.
    pub fn label_for(&self, file_id: &str) -> Option<SplitLabel> {
        [SplitLabel::Eval, SplitLabel::Train]
            .into_iter()
            .find(|label| self.files(*label).iter().any(|score| score.file_id == file_id))
    }

    /// Files across both buckets.
    pub fn len(&self) -> usize {
        self.eval.len() + self.train.len()
    }

    /// True when both buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

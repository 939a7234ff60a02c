//! Worklist subset selection.
//!
//! The hex-key fixture holds its screws in rows of six, three on the top
//! face followed by three on the bottom face. [`SectionRule`] expresses that
//! as a periodic pattern: within each period of `period` entries the first
//! `block` are "top", the rest "bottom".

use selene_common::config::ConfigError;
use selene_common::consts::{DEFAULT_SECTION_BLOCK, DEFAULT_SECTION_PERIOD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the worklist a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    All,
    Top,
    Bottom,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Top => "top",
            Self::Bottom => "bottom",
        })
    }
}

/// Periodic top/bottom pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    pub period: usize,
    pub block: usize,
}

impl Default for SectionRule {
    fn default() -> Self {
        Self {
            period: DEFAULT_SECTION_PERIOD,
            block: DEFAULT_SECTION_BLOCK,
        }
    }
}

impl SectionRule {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block == 0 || self.block > self.period {
            return Err(ConfigError::ValidationError(format!(
                "section_rule needs 0 < block <= period, got block {} period {}",
                self.block, self.period
            )));
        }
        Ok(())
    }

    pub fn is_top(&self, index: usize) -> bool {
        index
            .checked_rem(self.period)
            .is_some_and(|offset| offset < self.block)
    }
}

/// Predicate over worklist indices.
pub trait EntryFilter {
    fn selects(&self, index: usize) -> bool;

    /// Selected indices of a worklist of `len` entries, ascending.
    fn select(&self, len: usize) -> Vec<usize> {
        (0..len).filter(|&index| self.selects(index)).collect()
    }
}

impl<F: Fn(usize) -> bool> EntryFilter for F {
    fn selects(&self, index: usize) -> bool {
        self(index)
    }
}

/// A [`Section`] under a [`SectionRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSelection {
    pub section: Section,
    pub rule: SectionRule,
}

impl SectionSelection {
    pub fn new(section: Section, rule: SectionRule) -> Self {
        Self { section, rule }
    }
}

impl EntryFilter for SectionSelection {
    fn selects(&self, index: usize) -> bool {
        match self.section {
            Section::All => true,
            Section::Top => self.rule.is_top(index),
            Section::Bottom => !self.rule.is_top(index),
        }
    }
}

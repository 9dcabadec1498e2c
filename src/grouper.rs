// ==============================================================================
// grouper.rs - Consensus Grouping
// ==============================================================================
// Description: Groups caller observations by exact variant key
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use tracing::debug;

use crate::models::{ConsensusRecord, KeyedObservation, VariantKey};

/// Variant key → consensus record
///
/// A second observation from the same caller for the same key replaces the
/// first, so duplicate lines never add support.
#[derive(Debug, Default)]
pub struct ConsensusGrouper {
    records: HashMap<VariantKey, ConsensusRecord>,
    observations: usize,
    duplicates: usize,
}

impl ConsensusGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, keyed: KeyedObservation) {
        let KeyedObservation { key, observation } = keyed;
        self.observations += 1;

        let record = self
            .records
            .entry(key)
            .or_insert_with_key(|key| ConsensusRecord::new(key.clone()));

        if let Some(replaced) = record.insert(observation) {
            debug!(
                "Duplicate {} record for {}, keeping the later one",
                replaced.caller, record.key
            );
            self.duplicates += 1;
        }
    }

    pub fn extend<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = KeyedObservation>,
    {
        for keyed in observations {
            self.add(keyed);
        }
    }

    /// Distinct variant keys
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Observations folded in so far
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Observations that replaced an earlier one from the same caller
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_records(self) -> HashMap<VariantKey, ConsensusRecord> {
        self.records
    }
}

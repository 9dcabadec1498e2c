// ==============================================================================
// consensus.rs - Consensus Builder
// ==============================================================================
// Description: Quorum filtering and per-field consensus over grouped calls
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Per record:
//   - Genotype: majority vote, ties go to the highest-priority caller
//   - AF, DP: mean over callers that report a value
//   - GQ:     max over callers that report a value
//   - SOMATIC: any supporting caller flagged it
// ==============================================================================

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{Caller, ConsensusRecord, VariantKey};

/// Minimum number of distinct callers for a variant to be emitted
pub const MIN_SUPPORT: usize = 2;

/// A variant that met quorum, with its consensus fields
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusCall {
    pub record: ConsensusRecord,
    pub genotype: String,
    pub allele_frequency: Option<f64>,
    pub depth: Option<f64>,
    pub genotype_quality: Option<f64>,
    pub somatic: bool,
}

impl ConsensusCall {
    pub fn key(&self) -> &VariantKey {
        &self.record.key
    }

    pub fn support_count(&self) -> usize {
        self.record.support_count()
    }

    pub fn callers(&self) -> Vec<Caller> {
        self.record.callers()
    }
}

/// Calls in output order plus the number of keys below quorum
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub calls: Vec<ConsensusCall>,
    pub dropped: usize,
}

pub struct ConsensusBuilder {
    min_support: usize,
}

impl ConsensusBuilder {
    pub fn new() -> Self {
        Self {
            min_support: MIN_SUPPORT,
        }
    }

    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.min_support = min_support.max(MIN_SUPPORT);
        self
    }

    pub fn build(&self, records: HashMap<VariantKey, ConsensusRecord>) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();

        for record in records.into_values() {
            if record.support_count() < self.min_support {
                debug!(
                    "Dropping {} (support {} < {})",
                    record.key,
                    record.support_count(),
                    self.min_support
                );
                outcome.dropped += 1;
                continue;
            }

            if let Some(call) = Self::consensus(record) {
                outcome.calls.push(call);
            }
        }

        outcome.calls.sort_by(|a, b| a.record.key.cmp(&b.record.key));
        outcome
    }

    fn consensus(record: ConsensusRecord) -> Option<ConsensusCall> {
        let genotype = majority_genotype(&record)?;

        let allele_frequency = mean(
            &record.key,
            "AF",
            record.observations.iter().filter_map(|o| o.allele_frequency),
        );
        let depth = mean(
            &record.key,
            "DP",
            record.observations.iter().map(|o| f64::from(o.depth)),
        );
        let genotype_quality = max(
            &record.key,
            "GQ",
            record.observations.iter().filter_map(|o| o.genotype_quality),
        );
        let somatic = record.observations.iter().any(|o| o.somatic);

        Some(ConsensusCall {
            record,
            genotype,
            allele_frequency,
            depth,
            genotype_quality,
            somatic,
        })
    }
}

impl Default for ConsensusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Most common genotype; on a tie, the one seen first
///
/// Observations are held in caller priority order, so first seen is the
/// highest-priority caller among the tied genotypes.
pub fn majority_genotype(record: &ConsensusRecord) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for observation in &record.observations {
        match counts.iter_mut().find(|(g, _)| *g == observation.genotype) {
            Some((_, count)) => *count += 1,
            None => counts.push((observation.genotype.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (genotype, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((genotype, count));
        }
    }

    best.map(|(g, _)| g.to_string())
}

fn finite_values<I>(key: &VariantKey, field: &str, values: I) -> Vec<f64>
where
    I: Iterator<Item = f64>,
{
    values
        .filter(|v| {
            if v.is_finite() {
                true
            } else {
                warn!("{}: ignoring non-finite {} value", key, field);
                false
            }
        })
        .collect()
}

fn mean<I>(key: &VariantKey, field: &str, values: I) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    let values = finite_values(key, field, values);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn max<I>(key: &VariantKey, field: &str, values: I) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    finite_values(key, field, values).into_iter().reduce(f64::max)
}

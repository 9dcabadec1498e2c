// ==============================================================================
// models.rs - Variant Record Model
// ==============================================================================
// Description: Callers, variant keys, per-caller observations and consensus records
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Somatic variant caller whose VCF can be merged
///
/// Declaration order is the caller priority order (see [`CALLER_PRIORITY`]),
/// so the derived `Ord` sorts callers from highest to lowest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Caller {
    /// GATK Mutect2 (SNVs and indels in one file)
    Mutect2,
    /// MuSE (SNVs)
    Muse,
    /// Strelka2 somatic SNVs
    StrelkaSnvs,
    /// Strelka2 somatic indels
    StrelkaIndels,
    /// VarScan2 somatic SNVs
    VarscanSnvs,
    /// VarScan2 somatic indels
    VarscanIndels,
}

/// Fixed caller priority used for input ordering and genotype tie-breaks
pub const CALLER_PRIORITY: [Caller; 6] = [
    Caller::Mutect2,
    Caller::Muse,
    Caller::StrelkaSnvs,
    Caller::StrelkaIndels,
    Caller::VarscanSnvs,
    Caller::VarscanIndels,
];

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown caller: '{0}' (expected one of mutect2, muse, strelka-snvs, strelka-indels, varscan-snvs, varscan-indels)")]
pub struct UnknownCallerError(pub String);

impl Caller {
    pub fn as_str(&self) -> &'static str {
        match self {
            Caller::Mutect2 => "mutect2",
            Caller::Muse => "muse",
            Caller::StrelkaSnvs => "strelka-snvs",
            Caller::StrelkaIndels => "strelka-indels",
            Caller::VarscanSnvs => "varscan-snvs",
            Caller::VarscanIndels => "varscan-indels",
        }
    }

    /// Position in [`CALLER_PRIORITY`] (0 = highest priority)
    pub fn priority(&self) -> usize {
        CALLER_PRIORITY
            .iter()
            .position(|c| c == self)
            .unwrap_or(CALLER_PRIORITY.len())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Caller {
    type Err = UnknownCallerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        CALLER_PRIORITY
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownCallerError(s.to_string()))
    }
}

/// Sort rank of a chromosome name under the standard reference order
///
/// `1`-`22` come first numerically, then `X`, `Y` and the mitochondrial
/// contig (`M`/`MT`). Any other contig sorts after them by name. A leading
/// `chr` prefix is ignored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChromosomeRank {
    Standard(u32),
    Other(String),
}

impl ChromosomeRank {
    pub fn of(chromosome: &str) -> Self {
        let name = strip_chr_prefix(chromosome);

        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = name.parse::<u32>() {
                return ChromosomeRank::Standard(n);
            }
        }

        match name {
            "X" | "x" => ChromosomeRank::Standard(23),
            "Y" | "y" => ChromosomeRank::Standard(24),
            "M" | "MT" | "m" | "mt" | "Mt" => ChromosomeRank::Standard(25),
            _ => ChromosomeRank::Other(name.to_string()),
        }
    }
}

fn strip_chr_prefix(chromosome: &str) -> &str {
    match chromosome.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &chromosome[3..],
        _ => chromosome,
    }
}

/// Compare two chromosome names under the standard reference order
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    ChromosomeRank::of(a)
        .cmp(&ChromosomeRank::of(b))
        .then_with(|| a.cmp(b))
}

/// Genomic identity of a candidate variant
///
/// Equality is exact string/integer equality; no allele normalization is
/// applied beyond what each caller already emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    /// Chromosome name as written by the caller (e.g., "chr1")
    pub chromosome: String,

    /// 1-based position
    pub position: u64,

    /// Reference allele
    pub ref_allele: String,

    /// Alternate allele (ALT column, kept verbatim)
    pub alt_allele: String,
}

impl VariantKey {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
        }
    }
}

impl Ord for VariantKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_chromosomes(&self.chromosome, &other.chromosome)
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.ref_allele.cmp(&other.ref_allele))
            .then_with(|| self.alt_allele.cmp(&other.alt_allele))
    }
}

impl PartialOrd for VariantKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.chromosome, self.position, self.ref_allele, self.alt_allele
        )
    }
}

/// One caller's normalized evidence for a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerObservation {
    /// Caller that produced the record
    pub caller: Caller,

    /// Unphased genotype (e.g., "0/1", "1/1")
    pub genotype: String,

    /// Tumor allele frequency (0.0-1.0), None if not reported
    pub allele_frequency: Option<f64>,

    /// Tumor read depth
    pub depth: u32,

    /// Genotype quality, None if not reported
    pub genotype_quality: Option<f64>,

    /// Caller flagged the record as somatic
    pub somatic: bool,
}

/// Observation paired with the key it was read under
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedObservation {
    pub key: VariantKey,
    pub observation: CallerObservation,
}

/// A variant key plus every caller observation supporting it
///
/// Observations are kept in caller priority order with at most one per caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub key: VariantKey,
    pub observations: Vec<CallerObservation>,
}

impl ConsensusRecord {
    pub fn new(key: VariantKey) -> Self {
        Self {
            key,
            observations: Vec::new(),
        }
    }

    /// Number of distinct callers supporting the variant
    pub fn support_count(&self) -> usize {
        self.observations.len()
    }

    /// Supporting callers in priority order
    pub fn callers(&self) -> Vec<Caller> {
        self.observations.iter().map(|o| o.caller).collect()
    }

    /// Add an observation, replacing an earlier one from the same caller
    ///
    /// Returns the replaced observation, if any.
    pub fn insert(&mut self, observation: CallerObservation) -> Option<CallerObservation> {
        match self
            .observations
            .binary_search_by(|o| o.caller.cmp(&observation.caller))
        {
            Ok(idx) => Some(std::mem::replace(&mut self.observations[idx], observation)),
            Err(idx) => {
                self.observations.insert(idx, observation);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(caller: Caller, genotype: &str) -> CallerObservation {
        CallerObservation {
            caller,
            genotype: genotype.to_string(),
            allele_frequency: None,
            depth: 10,
            genotype_quality: None,
            somatic: false,
        }
    }

    #[test]
    fn test_caller_priority_matches_ord() {
        let mut sorted = CALLER_PRIORITY.to_vec();
        sorted.sort();
        assert_eq!(sorted, CALLER_PRIORITY.to_vec());

        assert_eq!(Caller::Mutect2.priority(), 0);
        assert_eq!(Caller::VarscanIndels.priority(), 5);
        assert!(Caller::Muse < Caller::StrelkaSnvs);
    }

    #[test]
    fn test_caller_names_round_trip() {
        for caller in CALLER_PRIORITY {
            assert_eq!(caller.as_str().parse::<Caller>().unwrap(), caller);
        }
        assert_eq!("Strelka_SNVs".parse::<Caller>().unwrap(), Caller::StrelkaSnvs);
        assert!("freebayes".parse::<Caller>().is_err());
    }

    #[test]
    fn test_caller_serde_names() {
        let json = serde_json::to_string(&Caller::VarscanIndels).unwrap();
        assert_eq!(json, "\"varscan-indels\"");

        let parsed: Caller = serde_json::from_str("\"mutect2\"").unwrap();
        assert_eq!(parsed, Caller::Mutect2);
    }

    #[test]
    fn test_chromosome_rank() {
        assert_eq!(ChromosomeRank::of("chr1"), ChromosomeRank::Standard(1));
        assert_eq!(ChromosomeRank::of("22"), ChromosomeRank::Standard(22));
        assert_eq!(ChromosomeRank::of("chrX"), ChromosomeRank::Standard(23));
        assert_eq!(ChromosomeRank::of("Y"), ChromosomeRank::Standard(24));
        assert_eq!(ChromosomeRank::of("chrM"), ChromosomeRank::Standard(25));
        assert_eq!(ChromosomeRank::of("MT"), ChromosomeRank::Standard(25));
        assert_eq!(
            ChromosomeRank::of("chrUn_gl000220"),
            ChromosomeRank::Other("Un_gl000220".to_string())
        );
    }

    #[test]
    fn test_chromosome_order_is_not_lexical() {
        let mut names = vec!["chr10", "chrX", "chr2", "chrM", "chr1", "chrUn", "chrY", "chr22"];
        names.sort_by(|a, b| compare_chromosomes(a, b));
        assert_eq!(
            names,
            vec!["chr1", "chr2", "chr10", "chr22", "chrX", "chrY", "chrM", "chrUn"]
        );
    }

    #[test]
    fn test_variant_key_ordering() {
        let a = VariantKey::new("chr2", 500, "A", "T");
        let b = VariantKey::new("chr10", 100, "A", "T");
        let c = VariantKey::new("chr2", 100, "A", "T");
        let mut keys = vec![a.clone(), b.clone(), c.clone()];
        keys.sort();
        assert_eq!(keys, vec![c, a, b]);
    }

    #[test]
    fn test_variant_key_display() {
        let key = VariantKey::new("chr1", 100000, "A", "T");
        assert_eq!(key.to_string(), "chr1:100000 A>T");
    }

    #[test]
    fn test_record_insert_keeps_priority_order() {
        let mut record = ConsensusRecord::new(VariantKey::new("chr1", 1, "A", "C"));
        assert!(record.insert(observation(Caller::VarscanSnvs, "0/1")).is_none());
        assert!(record.insert(observation(Caller::Mutect2, "0/1")).is_none());
        assert!(record.insert(observation(Caller::StrelkaSnvs, "1/1")).is_none());

        assert_eq!(
            record.callers(),
            vec![Caller::Mutect2, Caller::StrelkaSnvs, Caller::VarscanSnvs]
        );
        assert_eq!(record.support_count(), 3);
    }

    #[test]
    fn test_record_insert_replaces_same_caller() {
        let mut record = ConsensusRecord::new(VariantKey::new("chr1", 1, "A", "C"));
        record.insert(observation(Caller::Muse, "0/1"));
        let replaced = record.insert(observation(Caller::Muse, "1/1"));

        assert_eq!(replaced.map(|o| o.genotype), Some("0/1".to_string()));
        assert_eq!(record.support_count(), 1);
        assert_eq!(record.observations[0].genotype, "1/1");
    }
}

// ==============================================================================
// callers/mod.rs - Per-caller record adapters
// ==============================================================================
// Description: Turns one caller's VCF lines into normalized observations
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Each caller writes genotype, allele frequency and depth differently:
//   - Mutect2:  FORMAT GT/AF/DP/GQ
//   - MuSE:     FORMAT GT/DP, AF from FORMAT AD
//   - Strelka:  no GT; genotype from INFO SGT, AF from tier-1 allele counts
//   - VarScan:  FORMAT GT/DP/GQ, AF from FORMAT FREQ ("35.71%")
// ==============================================================================

pub mod muse;
pub mod mutect2;
pub mod reader;
pub mod strelka;
pub mod varscan;

pub use reader::{CallerReader, ReadStats};

use thiserror::Error;
use tracing::debug;

use crate::genotype_converter::{normalize_genotype, GenotypeConversionError};
use crate::models::{Caller, CallerObservation};
use crate::parsers::VcfLine;

/// Why a well-formed line could not become an observation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field} value '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error(transparent)]
    Genotype(#[from] GenotypeConversionError),
}

/// Caller-specific extraction of a [`CallerObservation`] from a VCF line
pub trait CallerAdapter: Send + Sync {
    fn caller(&self) -> Caller;

    /// Build the observation from the tumor sample column
    ///
    /// Fails when genotype or depth is missing; optional fields that do not
    /// parse are left empty.
    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError>;
}

/// Adapter for a caller
pub fn adapter_for(caller: Caller) -> Box<dyn CallerAdapter> {
    match caller {
        Caller::Mutect2 => Box::new(mutect2::Mutect2Adapter),
        Caller::Muse => Box::new(muse::MuseAdapter),
        Caller::StrelkaSnvs => Box::new(strelka::StrelkaSnvAdapter),
        Caller::StrelkaIndels => Box::new(strelka::StrelkaIndelAdapter),
        Caller::VarscanSnvs | Caller::VarscanIndels => Box::new(varscan::VarscanAdapter::new(caller)),
    }
}

/// FORMAT GT of the tumor sample, unphased
pub(crate) fn required_genotype(line: &VcfLine, tumor: usize) -> Result<String, ObservationError> {
    line.sample_value(tumor, "GT")
        .and_then(normalize_genotype)
        .ok_or(ObservationError::MissingField("GT"))
}

/// Parse a mandatory depth value
pub(crate) fn required_depth(value: Option<&str>, field: &'static str) -> Result<u32, ObservationError> {
    let value = value.ok_or(ObservationError::MissingField(field))?;
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ObservationError::InvalidField {
            field,
            value: value.to_string(),
        })
}

/// Parse an optional numeric value, keeping only the first of a Number=A list
///
/// Unparsable or non-finite values read as absent.
pub(crate) fn optional_float(line: &VcfLine, value: Option<&str>, field: &str) -> Option<f64> {
    let raw = first_value(value?)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!(
                "Line {}: ignoring unparsable {} value '{}'",
                line.line_number, field, raw
            );
            None
        }
    }
}

/// First entry of a comma-separated value, None if it is empty or "."
pub(crate) fn first_value(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ".")
}

/// Parse a read count, None if it is not a non-negative integer
pub(crate) fn read_count(value: Option<&str>) -> Option<u64> {
    first_value(value?)?.parse::<u64>().ok()
}

// ==============================================================================
// callers/muse.rs - MuSE adapter
// ==============================================================================
// Description: Observations from MuSE FORMAT GT/DP with AF from allelic depths
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use tracing::debug;

use super::{required_depth, required_genotype, CallerAdapter, ObservationError};
use crate::genotype_converter::allele_fraction;
use crate::models::{Caller, CallerObservation};
use crate::parsers::VcfLine;

pub struct MuseAdapter;

impl MuseAdapter {
    /// ALT fraction from FORMAT AD ("ref,alt[,alt2...]")
    fn allele_frequency(line: &VcfLine, tumor: usize) -> Option<f64> {
        let ad = line.sample_value(tumor, "AD")?;
        let mut counts = ad.split(',').map(|c| c.trim().parse::<u64>());

        match (counts.next(), counts.next()) {
            (Some(Ok(ref_count)), Some(Ok(alt_count))) => allele_fraction(ref_count, alt_count),
            _ => {
                debug!("Line {}: ignoring unparsable AD value '{}'", line.line_number, ad);
                None
            }
        }
    }
}

impl CallerAdapter for MuseAdapter {
    fn caller(&self) -> Caller {
        Caller::Muse
    }

    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError> {
        Ok(CallerObservation {
            caller: Caller::Muse,
            genotype: required_genotype(line, tumor)?,
            allele_frequency: Self::allele_frequency(line, tumor),
            depth: required_depth(line.sample_value(tumor, "DP"), "DP")?,
            genotype_quality: None,
            somatic: line.info_flag("SOMATIC"),
        })
    }
}

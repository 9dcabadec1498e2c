// ==============================================================================
// callers/mutect2.rs - GATK Mutect2 adapter
// ==============================================================================
// Description: Observations from Mutect2 FORMAT GT/AF/DP/GQ
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use super::{optional_float, required_depth, required_genotype, CallerAdapter, ObservationError};
use crate::models::{Caller, CallerObservation};
use crate::parsers::VcfLine;

pub struct Mutect2Adapter;

impl CallerAdapter for Mutect2Adapter {
    fn caller(&self) -> Caller {
        Caller::Mutect2
    }

    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError> {
        let genotype = required_genotype(line, tumor)?;

        // Older Mutect2 releases only report depth in INFO
        let depth = required_depth(
            line.sample_value(tumor, "DP").or_else(|| line.info_value("DP")),
            "DP",
        )?;

        Ok(CallerObservation {
            caller: Caller::Mutect2,
            genotype,
            allele_frequency: optional_float(line, line.sample_value(tumor, "AF"), "AF"),
            depth,
            genotype_quality: optional_float(line, line.sample_value(tumor, "GQ"), "GQ"),
            somatic: line.info_flag("SOMATIC"),
        })
    }
}

// ==============================================================================
// callers/varscan.rs - VarScan2 somatic adapter
// ==============================================================================
// Description: Observations from VarScan2 SNV and indel VCFs
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Somatic status: INFO SOMATIC flag, or SS=2 (0=reference, 1=germline,
// 2=somatic, 3=LOH, 5=unknown).
// ==============================================================================

use tracing::debug;

use super::{optional_float, required_depth, required_genotype, CallerAdapter, ObservationError};
use crate::genotype_converter::parse_percent;
use crate::models::{Caller, CallerObservation};
use crate::parsers::VcfLine;

const SOMATIC_STATUS: &str = "2";

/// Same record layout for the SNV and indel files
pub struct VarscanAdapter {
    caller: Caller,
}

impl VarscanAdapter {
    pub fn new(caller: Caller) -> Self {
        Self { caller }
    }

    fn allele_frequency(line: &VcfLine, tumor: usize) -> Option<f64> {
        let freq = line.sample_value(tumor, "FREQ")?;
        let af = parse_percent(freq);
        if af.is_none() {
            debug!("Line {}: ignoring unparsable FREQ value '{}'", line.line_number, freq);
        }
        af
    }
}

impl CallerAdapter for VarscanAdapter {
    fn caller(&self) -> Caller {
        self.caller
    }

    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError> {
        // Negative GQ is VarScan's missing-value sentinel
        let genotype_quality =
            optional_float(line, line.sample_value(tumor, "GQ"), "GQ").filter(|gq| *gq >= 0.0);

        Ok(CallerObservation {
            caller: self.caller,
            genotype: required_genotype(line, tumor)?,
            allele_frequency: Self::allele_frequency(line, tumor),
            depth: required_depth(line.sample_value(tumor, "DP"), "DP")?,
            genotype_quality,
            somatic: line.info_flag("SOMATIC") || line.info_value("SS") == Some(SOMATIC_STATUS),
        })
    }
}

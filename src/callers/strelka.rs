// ==============================================================================
// callers/strelka.rs - Strelka2 somatic SNV and indel adapters
// ==============================================================================
// Description: Observations from Strelka2 somatic VCFs
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Strelka somatic VCFs carry no FORMAT GT. The tumor genotype comes from INFO
// SGT ("CC->CT", "ref->het"). Allele counts are "tier1,tier2" pairs:
//   - SNVs:   AU, CU, GU, TU (one per base)
//   - Indels: TAR (reference-supporting), TIR (indel-supporting)
// ==============================================================================

use super::{read_count, required_depth, CallerAdapter, ObservationError};
use crate::genotype_converter::{allele_fraction, sgt_to_genotype};
use crate::models::{Caller, CallerObservation};
use crate::parsers::VcfLine;

/// Tumor genotype from INFO SGT
fn genotype(line: &VcfLine) -> Result<String, ObservationError> {
    let sgt = line
        .info_value("SGT")
        .ok_or(ObservationError::MissingField("SGT"))?;
    Ok(sgt_to_genotype(sgt, line.reference(), first_alternate(line))?)
}

fn first_alternate(line: &VcfLine) -> &str {
    line.alternate().split(',').next().unwrap_or_default()
}

pub struct StrelkaSnvAdapter;

impl StrelkaSnvAdapter {
    /// Tier-1 ALT/(REF+ALT) from the per-base count fields
    fn allele_frequency(line: &VcfLine, tumor: usize) -> Option<f64> {
        let ref_key = format!("{}U", line.reference().to_ascii_uppercase());
        let alt_key = format!("{}U", first_alternate(line).to_ascii_uppercase());

        let ref_count = read_count(line.sample_value(tumor, &ref_key))?;
        let alt_count = read_count(line.sample_value(tumor, &alt_key))?;
        allele_fraction(ref_count, alt_count)
    }
}

impl CallerAdapter for StrelkaSnvAdapter {
    fn caller(&self) -> Caller {
        Caller::StrelkaSnvs
    }

    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError> {
        Ok(CallerObservation {
            caller: Caller::StrelkaSnvs,
            genotype: genotype(line)?,
            allele_frequency: Self::allele_frequency(line, tumor),
            depth: required_depth(line.sample_value(tumor, "DP"), "DP")?,
            genotype_quality: None,
            somatic: line.info_flag("SOMATIC"),
        })
    }
}

pub struct StrelkaIndelAdapter;

impl StrelkaIndelAdapter {
    /// Tier-1 TIR/(TAR+TIR)
    fn allele_frequency(line: &VcfLine, tumor: usize) -> Option<f64> {
        let tar = read_count(line.sample_value(tumor, "TAR"))?;
        let tir = read_count(line.sample_value(tumor, "TIR"))?;
        allele_fraction(tar, tir)
    }
}

impl CallerAdapter for StrelkaIndelAdapter {
    fn caller(&self) -> Caller {
        Caller::StrelkaIndels
    }

    fn observe(&self, line: &VcfLine, tumor: usize) -> Result<CallerObservation, ObservationError> {
        Ok(CallerObservation {
            caller: Caller::StrelkaIndels,
            genotype: genotype(line)?,
            allele_frequency: Self::allele_frequency(line, tumor),
            depth: required_depth(line.sample_value(tumor, "DP"), "DP")?,
            genotype_quality: None,
            somatic: line.info_flag("SOMATIC"),
        })
    }
}

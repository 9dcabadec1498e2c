// ==============================================================================
// genotype_converter.rs - Genotype and Frequency Normalization
// ==============================================================================
// Description: Normalizes per-caller genotype and allele frequency encodings
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Algorithm (Strelka SGT, e.g. "CC->CT" with REF=C, ALT=T):
//   Take the tumor genotype after "->" and count ALT alleles:
//   - REF/REF (e.g., CC) → "0/0"
//   - REF/ALT or ALT/REF (e.g., CT, TC) → "0/1"
//   - ALT/ALT (e.g., TT) → "1/1"
//   Indel SGT uses words instead of bases: ref → "0/0", het → "0/1", hom → "1/1"
// ==============================================================================

use thiserror::Error;

/// Errors that can occur during genotype conversion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenotypeConversionError {
    #[error("Invalid SGT format: '{0}' (expected NORMAL->TUMOR)")]
    InvalidFormat(String),

    #[error("SGT genotype '{genotype}' does not match REF '{ref_allele}' or ALT '{alt_allele}' alleles")]
    AllelesMismatch {
        genotype: String,
        ref_allele: String,
        alt_allele: String,
    },

    #[error("Unsupported SGT genotype '{0}'")]
    Unsupported(String),
}

/// Normalize a VCF GT value
///
/// Phased separators are rewritten as unphased (`0|1` → `0/1`) so callers
/// that phase and callers that don't vote for the same genotype.
///
/// # Returns
/// * `Some(genotype)` - Normalized genotype
/// * `None` - Empty or no-call genotype (`.`, `./.`, `.|.`)
pub fn normalize_genotype(genotype: &str) -> Option<String> {
    let genotype = genotype.trim();
    if genotype.is_empty() {
        return None;
    }

    let normalized = genotype.replace('|', "/");
    if normalized.split('/').all(|allele| allele == ".") {
        return None;
    }

    Some(normalized)
}

/// Convert a Strelka somatic genotype (INFO/SGT) to a VCF genotype
///
/// # Arguments
/// * `sgt` - SGT value, e.g. "CC->CT" for SNVs or "ref->het" for indels
/// * `ref_allele` - Reference allele from the record
/// * `alt_allele` - Alternate allele from the record
///
/// # Examples
/// ```
/// use somatic_combiner::genotype_converter::sgt_to_genotype;
///
/// assert_eq!(sgt_to_genotype("CC->CT", "C", "T").unwrap(), "0/1");
/// assert_eq!(sgt_to_genotype("CC->TT", "C", "T").unwrap(), "1/1");
/// assert_eq!(sgt_to_genotype("ref->het", "CA", "C").unwrap(), "0/1");
/// ```
pub fn sgt_to_genotype(
    sgt: &str,
    ref_allele: &str,
    alt_allele: &str,
) -> Result<String, GenotypeConversionError> {
    let tumor = sgt
        .split_once("->")
        .map(|(_, tumor)| tumor.trim())
        .filter(|tumor| !tumor.is_empty())
        .ok_or_else(|| GenotypeConversionError::InvalidFormat(sgt.to_string()))?;

    match tumor {
        "ref" => return Ok("0/0".to_string()),
        "het" => return Ok("0/1".to_string()),
        "hom" => return Ok("1/1".to_string()),
        "conflict" => return Err(GenotypeConversionError::Unsupported(tumor.to_string())),
        _ => {}
    }

    // Base genotypes only make sense for single-base alleles
    if tumor.len() != 2 || ref_allele.len() != 1 || alt_allele.len() != 1 {
        return Err(GenotypeConversionError::AllelesMismatch {
            genotype: tumor.to_string(),
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        });
    }

    let mut alt_count = 0;
    for base in tumor.chars() {
        let base = base.to_string();
        if base.eq_ignore_ascii_case(alt_allele) {
            alt_count += 1;
        } else if !base.eq_ignore_ascii_case(ref_allele) {
            return Err(GenotypeConversionError::AllelesMismatch {
                genotype: tumor.to_string(),
                ref_allele: ref_allele.to_string(),
                alt_allele: alt_allele.to_string(),
            });
        }
    }

    Ok(match alt_count {
        0 => "0/0",
        1 => "0/1",
        _ => "1/1",
    }
    .to_string())
}

/// Parse a VarScan FREQ value ("35.71%") into a fraction rounded to 3 decimals
pub fn parse_percent(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix('%').unwrap_or(value).trim();
    let percent = number.parse::<f64>().ok().filter(|p| p.is_finite())?;
    Some(round_to(percent / 100.0, 3))
}

/// Alternate allele fraction from read counts, None when there is no coverage
pub fn allele_fraction(ref_count: u64, alt_count: u64) -> Option<f64> {
    let total = ref_count + alt_count;
    if total == 0 {
        None
    } else {
        Some(alt_count as f64 / total as f64)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_genotype() {
        assert_eq!(normalize_genotype("0/1"), Some("0/1".to_string()));
        assert_eq!(normalize_genotype("0|1"), Some("0/1".to_string()));
        assert_eq!(normalize_genotype(" 1|1 "), Some("1/1".to_string()));
        assert_eq!(normalize_genotype("./."), None);
        assert_eq!(normalize_genotype(".|."), None);
        assert_eq!(normalize_genotype("."), None);
        assert_eq!(normalize_genotype(""), None);
        // Partially called genotypes are kept
        assert_eq!(normalize_genotype("./1"), Some("./1".to_string()));
    }

    #[test]
    fn test_sgt_snv_genotypes() {
        assert_eq!(sgt_to_genotype("CC->CC", "C", "T").unwrap(), "0/0");
        assert_eq!(sgt_to_genotype("CC->CT", "C", "T").unwrap(), "0/1");
        assert_eq!(sgt_to_genotype("CC->TC", "C", "T").unwrap(), "0/1");
        assert_eq!(sgt_to_genotype("CC->TT", "C", "T").unwrap(), "1/1");
        assert_eq!(sgt_to_genotype("GG->ga", "G", "A").unwrap(), "0/1");
    }

    #[test]
    fn test_sgt_indel_genotypes() {
        assert_eq!(sgt_to_genotype("ref->ref", "CA", "C").unwrap(), "0/0");
        assert_eq!(sgt_to_genotype("ref->het", "CA", "C").unwrap(), "0/1");
        assert_eq!(sgt_to_genotype("ref->hom", "C", "CAT").unwrap(), "1/1");
        assert_eq!(
            sgt_to_genotype("ref->conflict", "C", "CAT"),
            Err(GenotypeConversionError::Unsupported("conflict".to_string()))
        );
    }

    #[test]
    fn test_sgt_errors() {
        assert!(matches!(
            sgt_to_genotype("CT", "C", "T"),
            Err(GenotypeConversionError::InvalidFormat(_))
        ));
        assert!(matches!(
            sgt_to_genotype("CC->", "C", "T"),
            Err(GenotypeConversionError::InvalidFormat(_))
        ));
        assert!(matches!(
            sgt_to_genotype("CC->AG", "C", "T"),
            Err(GenotypeConversionError::AllelesMismatch { .. })
        ));
        // Base genotype on an indel record
        assert!(matches!(
            sgt_to_genotype("CC->CT", "CA", "C"),
            Err(GenotypeConversionError::AllelesMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("35.71%"), Some(0.357));
        assert_eq!(parse_percent("100%"), Some(1.0));
        assert_eq!(parse_percent("0%"), Some(0.0));
        assert_eq!(parse_percent("12.5"), Some(0.125));
        assert_eq!(parse_percent("."), None);
        assert_eq!(parse_percent("abc%"), None);
    }

    #[test]
    fn test_allele_fraction() {
        assert_eq!(allele_fraction(30, 10), Some(0.25));
        assert_eq!(allele_fraction(0, 5), Some(1.0));
        assert_eq!(allele_fraction(0, 0), None);
    }
}

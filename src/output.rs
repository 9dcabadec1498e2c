// ==============================================================================
// output.rs - Consensus VCF and Run Summary Output
// ==============================================================================
// Description: Writes the merged consensus VCF (plain or gzip) and a JSON run
//              summary, each finalized atomically
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Every file is written to a temporary file in the output directory and
// renamed over the final name only after a successful flush. A failed write
// leaves no file under the final name.
// ==============================================================================

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::callers::ReadStats;
use crate::consensus::ConsensusCall;
use crate::models::Caller;

pub const SOURCE: &str = concat!("somatic-combiner-", env!("CARGO_PKG_VERSION"));

/// Output sample column name
pub const SAMPLE_NAME: &str = "TUMOR";

const MISSING: &str = ".";

/// One caller that contributed to the merge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerProvenance {
    pub caller: Caller,
    pub file_name: String,
    pub sha256: String,
    pub stats: ReadStats,
}

/// Run-specific header content
#[derive(Debug, Clone, Default)]
pub struct OutputHeader {
    /// Contributing callers in priority order
    pub callers: Vec<CallerProvenance>,

    /// Contig names in output order
    pub contigs: Vec<String>,
}

/// Writes `<output_dir>/<id>.vcf[.gz]`
pub struct ConsensusVcfWriter {
    output_dir: PathBuf,
    id: String,
    compress: bool,
}

impl ConsensusVcfWriter {
    pub fn new(output_dir: impl Into<PathBuf>, id: impl Into<String>, compress: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            id: id.into(),
            compress,
        }
    }

    pub fn path(&self) -> PathBuf {
        let extension = if self.compress { "vcf.gz" } else { "vcf" };
        self.output_dir.join(format!("{}.{}", self.id, extension))
    }

    pub fn write(&self, header: &OutputHeader, calls: &[ConsensusCall]) -> Result<PathBuf> {
        let path = self.path();
        info!("Writing {} consensus records to {:?}", calls.len(), path);

        let compress = self.compress;
        write_atomically(&path, |writer| {
            if compress {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                write_vcf(&mut encoder, header, calls)?;
                encoder.finish()?;
            } else {
                write_vcf(writer, header, calls)?;
            }
            Ok(())
        })
        .with_context(|| format!("Failed to write consensus VCF {:?}", path))?;

        info!("Consensus VCF complete: {:?}", path);
        Ok(path)
    }
}

/// Write `path` through a temporary file in the same directory
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

    {
        let mut buffered = BufWriter::new(tmp.as_file());
        write(&mut buffered).context("Failed to write output")?;
        buffered.flush().context("Failed to flush output")?;
    }
    tmp.as_file().sync_all().context("Failed to sync output")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .context("Failed to set output permissions")?;
    }

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move output into place at {:?}", path))?;

    Ok(())
}

/// Write the full consensus VCF text
pub fn write_vcf<W: Write + ?Sized>(
    writer: &mut W,
    header: &OutputHeader,
    calls: &[ConsensusCall],
) -> std::io::Result<()> {
    write_header(writer, header)?;
    for call in calls {
        writeln!(writer, "{}", record_line(call))?;
    }
    Ok(())
}

fn write_header<W: Write + ?Sized>(writer: &mut W, header: &OutputHeader) -> std::io::Result<()> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(writer, "##source={}", SOURCE)?;

    let callers: Vec<&str> = header.callers.iter().map(|c| c.caller.as_str()).collect();
    if callers.is_empty() {
        writeln!(writer, "##combinerCallers={}", MISSING)?;
    } else {
        writeln!(writer, "##combinerCallers={}", callers.join(","))?;
    }

    for provenance in &header.callers {
        writeln!(
            writer,
            "##combinerInput=<ID={},File=\"{}\",SHA256={},Accepted={},Filtered={},Malformed={}>",
            provenance.caller,
            provenance.file_name.replace('"', "'"),
            provenance.sha256,
            provenance.stats.accepted,
            provenance.stats.filtered,
            provenance.stats.malformed
        )?;
    }

    for contig in &header.contigs {
        writeln!(writer, "##contig=<ID={}>", contig)?;
    }

    writeln!(writer, "##INFO=<ID=CC,Number=1,Type=Integer,Description=\"Number of callers supporting the variant\">")?;
    writeln!(writer, "##INFO=<ID=CL,Number=.,Type=String,Description=\"Callers supporting the variant, in caller priority order\">")?;
    writeln!(writer, "##INFO=<ID=SOMATIC,Number=0,Type=Flag,Description=\"At least one supporting caller flagged the variant as somatic\">")?;
    writeln!(writer, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Consensus genotype: majority vote, ties broken by caller priority\">")?;
    writeln!(writer, "##FORMAT=<ID=AF,Number=A,Type=Float,Description=\"Mean tumor allele frequency over callers reporting one\">")?;
    writeln!(writer, "##FORMAT=<ID=DP,Number=1,Type=Float,Description=\"Mean tumor read depth over supporting callers\">")?;
    writeln!(writer, "##FORMAT=<ID=GQ,Number=1,Type=Float,Description=\"Maximum genotype quality over callers reporting one\">")?;
    writeln!(
        writer,
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}",
        SAMPLE_NAME
    )?;

    Ok(())
}

/// One VCF data line (without terminator)
pub fn record_line(call: &ConsensusCall) -> String {
    let key = call.key();

    let callers: Vec<&str> = call.record.observations.iter().map(|o| o.caller.as_str()).collect();
    let mut info = format!("CC={};CL={}", call.support_count(), callers.join(","));
    if call.somatic {
        info.push_str(";SOMATIC");
    }

    let sample = [
        call.genotype.clone(),
        call.allele_frequency.map(format_float).unwrap_or_else(missing),
        call.depth.map(format_float).unwrap_or_else(missing),
        call.genotype_quality.map(format_quality).unwrap_or_else(missing),
    ]
    .join(":");

    format!(
        "{}\t{}\t.\t{}\t{}\t.\tPASS\t{}\tGT:AF:DP:GQ\t{}",
        key.chromosome, key.position, key.ref_allele, key.alt_allele, info, sample
    )
}

fn missing() -> String {
    MISSING.to_string()
}

/// Four decimals, trailing zeros trimmed, at least one decimal kept
///
/// `50.0` → "50.0", `0.4` → "0.4", `1.0 / 3.0` → "0.3333"
pub fn format_float(value: f64) -> String {
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0');
    let mut out = if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    };
    if out == "-0.0" {
        out = "0.0".to_string();
    }
    out
}

/// Integral qualities without decimals, others as [`format_float`]
pub fn format_quality(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format_float(value)
    }
}

/// Status of one configured caller in the run summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CallerStatus {
    Loaded {
        file: String,
        sha256: String,
        stats: ReadStats,
    },
    Failed {
        file: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerSummary {
    pub caller: Caller,
    #[serde(flatten)]
    pub status: CallerStatus,
}

/// `<id>.summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub source: String,
    pub id: String,
    pub output: String,
    pub min_support: usize,
    pub callers: Vec<CallerSummary>,
    pub distinct_variants: usize,
    pub duplicate_records: usize,
    pub emitted: usize,
    pub below_quorum: usize,
}

pub fn write_summary(path: &Path, summary: &MergeSummary) -> Result<()> {
    info!("Writing run summary to {:?}", path);

    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, summary)?;
        writeln!(writer)
    })
    .with_context(|| format!("Failed to write run summary {:?}", path))
}

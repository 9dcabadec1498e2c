// ==============================================================================
// main.rs - Somatic Combiner Entry Point
// ==============================================================================
// Description: Command line interface for merging somatic caller VCFs
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use somatic_combiner::config::{CallerPolicies, MergeConfig, MAX_READERS};
use somatic_combiner::consensus::MIN_SUPPORT;
use somatic_combiner::models::Caller;
use somatic_combiner::processor::SomaticCombiner;

/// Merge somatic variant calls supported by at least two callers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mutect2 VCF
    #[arg(long, env = "COMBINER_MUTECT2")]
    mutect2: Option<PathBuf>,

    /// MuSE VCF
    #[arg(long, env = "COMBINER_MUSE")]
    muse: Option<PathBuf>,

    /// Strelka2 somatic SNV VCF
    #[arg(long, env = "COMBINER_STRELKA_SNVS")]
    strelka_snvs: Option<PathBuf>,

    /// Strelka2 somatic indel VCF
    #[arg(long, env = "COMBINER_STRELKA_INDELS")]
    strelka_indels: Option<PathBuf>,

    /// VarScan2 somatic SNV VCF
    #[arg(long, env = "COMBINER_VARSCAN_SNVS")]
    varscan_snvs: Option<PathBuf>,

    /// VarScan2 somatic indel VCF
    #[arg(long, env = "COMBINER_VARSCAN_INDELS")]
    varscan_indels: Option<PathBuf>,

    /// Output directory (created if missing)
    #[arg(short, long, visible_alias = "output_dir", env = "COMBINER_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Output base name: writes <output-dir>/<id>.vcf
    #[arg(long, env = "COMBINER_ID")]
    id: String,

    /// Write <id>.vcf.gz instead of plain text
    #[arg(long, env = "COMBINER_COMPRESS")]
    compress: bool,

    /// Also write each caller's accepted records to <input stem>.filtered.vcf
    #[arg(long, env = "COMBINER_KEEP_FILTERED")]
    keep_filtered: bool,

    /// Tumor sample column name (default: ##tumor_sample, then TUMOR, then last column)
    #[arg(long, env = "COMBINER_TUMOR_SAMPLE")]
    tumor_sample: Option<String>,

    /// JSON file of accepted FILTER values per caller
    #[arg(long, env = "COMBINER_POLICY")]
    policy: Option<PathBuf>,

    /// Maximum caller files read in parallel
    #[arg(long, env = "COMBINER_THREADS", default_value_t = MAX_READERS)]
    threads: usize,

    /// Minimum number of supporting callers
    #[arg(long, env = "COMBINER_MIN_CALLERS", default_value_t = MIN_SUPPORT)]
    min_callers: usize,
}

impl Args {
    fn into_config(self) -> Result<MergeConfig> {
        let policies = match &self.policy {
            Some(path) => CallerPolicies::from_json_file(path)
                .with_context(|| format!("Failed to load filter policy {:?}", path))?,
            None => CallerPolicies::default(),
        };

        let mut config = MergeConfig::new(self.output_dir, self.id)
            .with_compress(self.compress)
            .with_keep_filtered(self.keep_filtered)
            .with_tumor_sample(self.tumor_sample)
            .with_min_support(self.min_callers)
            .with_threads(self.threads)
            .with_policies(policies);

        let inputs = [
            (Caller::Mutect2, self.mutect2),
            (Caller::Muse, self.muse),
            (Caller::StrelkaSnvs, self.strelka_snvs),
            (Caller::StrelkaIndels, self.strelka_indels),
            (Caller::VarscanSnvs, self.varscan_snvs),
            (Caller::VarscanIndels, self.varscan_indels),
        ];
        for (caller, path) in inputs {
            if let Some(path) = path {
                config = config.with_input(caller, path);
            }
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "somatic_combiner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.into_config()?;

    info!("Somatic combiner {} starting...", env!("CARGO_PKG_VERSION"));
    if config.inputs.len() < config.min_support {
        warn!(
            "{} caller file(s) supplied; the consensus will be empty",
            config.inputs.len()
        );
    }

    let combiner = SomaticCombiner::new(config);
    match combiner.run().await {
        Ok(report) => {
            info!(
                "Wrote {} consensus variants from {} callers to {:?}",
                report.emitted,
                report.callers_used.len(),
                report.output
            );
            if !report.callers_failed.is_empty() {
                warn!("Callers skipped due to input errors: {:?}", report.callers_failed);
            }
            Ok(())
        }
        Err(e) => {
            error!("Merge failed: {}", e);
            Err(e).context("Somatic consensus merge failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_to_config() {
        let args = Args::try_parse_from([
            "somatic-combiner",
            "--mutect2",
            "m.vcf",
            "--varscan-indels",
            "vi.vcf.gz",
            "--output-dir",
            "/tmp/out",
            "--id",
            "patient7",
            "--compress",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.inputs[0].caller, Caller::Mutect2);
        assert_eq!(config.inputs[1].caller, Caller::VarscanIndels);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.id, "patient7");
        assert!(config.compress);
        assert_eq!(config.min_support, MIN_SUPPORT);
        assert_eq!(config.threads, MAX_READERS);
    }

    #[test]
    fn test_cli_requires_output_and_id() {
        assert!(Args::try_parse_from(["somatic-combiner", "--id", "x"]).is_err());
    }

    #[test]
    fn test_cli_missing_policy_file() {
        let args = Args::try_parse_from([
            "somatic-combiner",
            "--output-dir",
            "/tmp/out",
            "--id",
            "x",
            "--policy",
            "/nonexistent/policy.json",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}

// ==============================================================================
// processor.rs - Somatic Consensus Merge Pipeline
// ==============================================================================
// Description: Validates caller inputs, reads them in parallel, groups and
//              builds consensus calls, then writes the merged VCF
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::callers::{CallerReader, ReadStats};
use crate::config::{CallerInput, ConfigError, FilterPolicy, MergeConfig};
use crate::consensus::ConsensusBuilder;
use crate::grouper::ConsensusGrouper;
use crate::models::{compare_chromosomes, Caller, KeyedObservation};
use crate::output::{
    write_summary, CallerProvenance, CallerStatus, CallerSummary, ConsensusVcfWriter,
    MergeSummary, OutputHeader, SOURCE,
};
use crate::parsers::VcfParseError;
use crate::validator::{InputValidator, ValidatedInput, ValidationError};

/// Fatal merge failures, named by stage
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Output directory {path:?} is not usable: {source}")]
    OutputDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Reading: all {0} caller inputs failed")]
    AllInputsFailed(usize),

    #[error("Reading: reader task failed: {0}")]
    ReadTask(#[from] tokio::task::JoinError),

    #[error("Reading: reader pool closed")]
    ReaderPool(#[from] tokio::sync::AcquireError),

    #[error("Writing: {0:#}")]
    Write(anyhow::Error),
}

/// Why one caller's file contributed nothing
#[derive(Error, Debug)]
enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] VcfParseError),

    #[error("Failed to write filtered copy {path:?}: {source}")]
    FilteredCopy {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of reading one caller's file
enum CallerOutcome {
    Loaded {
        input: ValidatedInput,
        caller: Caller,
        observations: Vec<KeyedObservation>,
        stats: ReadStats,
        contigs: Vec<String>,
    },
    Failed {
        caller: Caller,
        file: String,
        error: String,
    },
}

/// What a finished merge produced
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output: PathBuf,
    pub summary: PathBuf,
    pub callers_used: Vec<Caller>,
    pub callers_failed: Vec<Caller>,
    pub distinct_variants: usize,
    pub emitted: usize,
    pub below_quorum: usize,
}

/// One caller's read job, run on the blocking pool
struct ReadJob {
    input: CallerInput,
    policy: FilterPolicy,
    tumor_sample: Option<String>,
    filtered_path: Option<PathBuf>,
}

impl ReadJob {
    fn run(self) -> CallerOutcome {
        let caller = self.input.caller;
        let file = file_name(&self.input.path);

        match self.load() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: skipping {} ({})", caller, file, e);
                CallerOutcome::Failed {
                    caller,
                    file,
                    error: e.to_string(),
                }
            }
        }
    }

    fn load(&self) -> Result<CallerOutcome, LoadError> {
        let caller = self.input.caller;
        let validated = InputValidator::new().validate(&self.input.path)?;

        let mut reader = CallerReader::open(
            caller,
            &validated.path,
            self.policy.clone(),
            self.tumor_sample.as_deref(),
        )?;
        let contigs = reader.header().contigs.clone();

        // The filtered copy is only moved into place once the whole file has been read
        let filtered_tmp = match &self.filtered_path {
            Some(path) => {
                let (tmp, sink) = filtered_sink(path)?;
                reader = reader
                    .with_filtered_sink(sink)
                    .map_err(|source| LoadError::FilteredCopy {
                        path: path.clone(),
                        source,
                    })?;
                Some((tmp, path))
            }
            None => None,
        };

        let observations = reader
            .by_ref()
            .collect::<Result<Vec<KeyedObservation>, VcfParseError>>()?;
        let stats = reader.finish()?;

        if let Some((tmp, path)) = filtered_tmp {
            tmp.persist(path).map_err(|e| LoadError::FilteredCopy {
                path: path.clone(),
                source: e.error,
            })?;
            info!("{}: filtered copy written to {:?}", caller, path);
        }

        info!(
            "{}: {} records, {} accepted, {} filtered, {} malformed",
            caller, stats.records, stats.accepted, stats.filtered, stats.malformed
        );

        Ok(CallerOutcome::Loaded {
            input: validated,
            caller,
            observations,
            stats,
            contigs,
        })
    }
}

fn filtered_sink(
    path: &Path,
) -> Result<(tempfile::NamedTempFile, Box<dyn std::io::Write + Send>), LoadError> {
    let to_load_error = |source| LoadError::FilteredCopy {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".filtered.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(to_load_error)?;
    let file = tmp.reopen().map_err(to_load_error)?;

    Ok((tmp, Box::new(BufWriter::new(file))))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Merges one set of caller VCFs into a consensus VCF
pub struct SomaticCombiner {
    config: MergeConfig,
}

impl SomaticCombiner {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Main merge pipeline
    pub async fn run(&self) -> Result<MergeReport, MergeError> {
        let config = &self.config;
        info!(
            "Starting consensus merge '{}' of {} caller inputs",
            config.id,
            config.inputs.len()
        );

        // 1. Configuration and output directory
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir).map_err(|source| {
            MergeError::OutputDirectory {
                path: config.output_dir.clone(),
                source,
            }
        })?;

        let inputs = config.ordered_inputs();
        if inputs.len() < config.min_support {
            warn!(
                "Only {} caller inputs supplied; no variant can reach support {}",
                inputs.len(),
                config.min_support
            );
        }

        // 2. Read every caller (parallel, at most `threads` at once)
        let outcomes = self.read_inputs(&inputs).await?;

        // 3. Group in caller priority order
        let mut grouper = ConsensusGrouper::new();
        let mut provenance = Vec::new();
        let mut summaries = Vec::new();
        let mut callers_failed = Vec::new();
        let mut contigs = Vec::new();

        for outcome in outcomes {
            match outcome {
                CallerOutcome::Loaded {
                    input,
                    caller,
                    observations,
                    stats,
                    contigs: header_contigs,
                } => {
                    grouper.extend(observations);
                    contigs.extend(header_contigs);
                    summaries.push(CallerSummary {
                        caller,
                        status: CallerStatus::Loaded {
                            file: input.file_name.clone(),
                            sha256: input.sha256.clone(),
                            stats: stats.clone(),
                        },
                    });
                    provenance.push(CallerProvenance {
                        caller,
                        file_name: input.file_name,
                        sha256: input.sha256,
                        stats,
                    });
                }
                CallerOutcome::Failed {
                    caller,
                    file,
                    error,
                } => {
                    summaries.push(CallerSummary {
                        caller,
                        status: CallerStatus::Failed { file, error },
                    });
                    callers_failed.push(caller);
                }
            }
        }

        if !inputs.is_empty() && provenance.is_empty() {
            return Err(MergeError::AllInputsFailed(inputs.len()));
        }

        let distinct_variants = grouper.len();
        let duplicate_records = grouper.duplicates();
        info!(
            "Grouped {} observations into {} distinct variants ({} duplicate records replaced)",
            grouper.observations(),
            distinct_variants,
            duplicate_records
        );

        // 4. Quorum and consensus fields
        let outcome = ConsensusBuilder::new()
            .with_min_support(config.min_support)
            .build(grouper.into_records());
        info!(
            "{} variants met quorum, {} dropped below {} callers",
            outcome.calls.len(),
            outcome.dropped,
            config.min_support
        );

        // 5. Write VCF and summary
        contigs.extend(outcome.calls.iter().map(|c| c.key().chromosome.clone()));
        contigs.sort_by(|a, b| compare_chromosomes(a, b));
        contigs.dedup();

        let callers_used: Vec<Caller> = provenance.iter().map(|p| p.caller).collect();
        let header = OutputHeader {
            callers: provenance,
            contigs,
        };

        let output = ConsensusVcfWriter::new(&config.output_dir, config.id.trim(), config.compress)
            .write(&header, &outcome.calls)
            .map_err(MergeError::Write)?;

        let summary_path = config.summary_path();
        let summary = MergeSummary {
            source: SOURCE.to_string(),
            id: config.id.trim().to_string(),
            output: file_name(&output),
            min_support: config.min_support,
            callers: summaries,
            distinct_variants,
            duplicate_records,
            emitted: outcome.calls.len(),
            below_quorum: outcome.dropped,
        };
        write_summary(&summary_path, &summary).map_err(MergeError::Write)?;

        info!("Consensus merge complete: {:?}", output);

        Ok(MergeReport {
            output,
            summary: summary_path,
            callers_used,
            callers_failed,
            distinct_variants,
            emitted: summary.emitted,
            below_quorum: summary.below_quorum,
        })
    }

    async fn read_inputs(&self, inputs: &[CallerInput]) -> Result<Vec<CallerOutcome>, MergeError> {
        let config = &self.config;
        let semaphore = Arc::new(Semaphore::new(config.threads.max(1)));
        let mut handles = Vec::with_capacity(inputs.len());

        for input in inputs {
            let job = ReadJob {
                input: input.clone(),
                policy: config.policies.get(input.caller),
                tumor_sample: config.tumor_sample.clone(),
                filtered_path: config
                    .keep_filtered
                    .then(|| config.filtered_path(&input.path)),
            };

            let permit = semaphore.clone().acquire_owned().await?;
            debug!("Reading {} from {:?}", input.caller, input.path);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job.run()
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariantKey;
    use tempfile::TempDir;

    const HEADER: &str = "\
##fileformat=VCFv4.2
##contig=<ID=chr1,length=248956422>
##contig=<ID=chr2,length=242193529>
##contig=<ID=chr3,length=198295559>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNORMAL\tTUMOR
";

    const MUTECT2: &[&str] = &[
        "chr1\t100000\t.\tA\tT\t.\tPASS\tDP=100\tGT:AF:DP\t0/0:0.0:50\t0/1:0.3:40",
        "chr2\t50000\t.\tC\tG\t.\tPASS\tDP=80\tGT:AF:DP\t0/0:0.0:40\t0/1:0.2:40",
        "chr3\t200\t.\tG\tA\t.\tPASS\tDP=60\tGT:AF:DP:GQ\t0/0:0.0:30\t0|1:0.25:30:50",
        "chr3\t900\t.\tG\tA\t.\tgermline\tDP=60\tGT:AF:DP\t0/0:0.0:30\t0/1:0.25:30",
    ];

    const MUSE: &[&str] = &[
        "chr1\t100000\t.\tA\tT\t.\tPASS\tSOMATIC\tGT:DP:AD\t0/0:50:50,0\t0/1:60:30,30",
        "chr3\t200\t.\tG\tA\t.\tTier2\tSOMATIC\tGT:DP:AD\t0/0:30:30,0\t0/1:40:30,10",
        "chr3\t900\t.\tG\tA\t.\tPASS\t.\tGT:DP:AD\t0/0:30:30,0\t0/1:40:30,10",
    ];

    const VARSCAN_SNVS: &[&str] = &[
        "chr3\t200\t.\tG\tA\t.\tPASS\tDP=70;SS=2\tGT:GQ:DP:FREQ\t0/0:.:30:0%\t1/1:70:50:60%",
    ];

    fn write_vcf(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut text = HEADER.to_string();
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    struct Fixture {
        inputs: TempDir,
        output: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                inputs: TempDir::new().unwrap(),
                output: TempDir::new().unwrap(),
            }
        }

        fn config(&self) -> MergeConfig {
            MergeConfig::new(self.output.path().join("merged"), "sample1")
        }

        fn input(&self, name: &str, lines: &[&str]) -> PathBuf {
            write_vcf(&self.inputs, name, lines)
        }
    }

    fn data_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    fn find_line<'a>(lines: &'a [String], prefix: &str) -> Option<&'a String> {
        lines.iter().find(|l| l.starts_with(prefix))
    }

    #[tokio::test]
    async fn test_two_caller_consensus() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("mutect2.vcf", MUTECT2))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        assert_eq!(report.output, fx.output.path().join("merged/sample1.vcf"));
        assert_eq!(report.callers_used, vec![Caller::Mutect2, Caller::Muse]);

        let lines = data_lines(&report.output);
        assert_eq!(
            find_line(&lines, "chr1\t100000\t").unwrap(),
            "chr1\t100000\t.\tA\tT\t.\tPASS\tCC=2;CL=mutect2,muse;SOMATIC\tGT:AF:DP:GQ\t0/1:0.4:50.0:."
        );

        // Single-caller variant is excluded
        assert!(find_line(&lines, "chr2\t50000\t").is_none());

        // Mutect2's germline-filtered record does not count
        assert!(find_line(&lines, "chr3\t900\t").is_none());

        // MuSE tiers pass the default policy
        assert!(find_line(&lines, "chr3\t200\t").is_some());
        assert_eq!(report.emitted, 2);
    }

    #[tokio::test]
    async fn test_majority_genotype_over_three_callers() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("mutect2.vcf", MUTECT2))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE))
            .with_input(Caller::VarscanSnvs, fx.input("varscan.snp.vcf", VARSCAN_SNVS));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        let lines = data_lines(&report.output);
        let line = find_line(&lines, "chr3\t200\t").unwrap();

        assert!(line.contains("CC=3;CL=mutect2,muse,varscan-snvs;SOMATIC"));
        // AF mean of 0.25, 0.25, 0.6; DP mean of 30, 40, 50; GQ max of 50, 70
        assert!(line.ends_with("\t0/1:0.3667:40.0:70"));
    }

    #[tokio::test]
    async fn test_absent_caller_not_in_header() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE))
            .with_input(Caller::Mutect2, fx.input("mutect2.vcf", MUTECT2));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        let text = std::fs::read_to_string(&report.output).unwrap();

        assert!(text.contains("##combinerCallers=mutect2,muse\n"));
        assert!(text.contains("##combinerInput=<ID=mutect2,File=\"mutect2.vcf\""));
        assert!(text.contains("##combinerInput=<ID=muse,File=\"muse.vcf\""));
        assert!(!text.contains("varscan"));
        assert!(!text.contains("strelka"));
        assert!(text.contains("##contig=<ID=chr1>\n##contig=<ID=chr2>\n##contig=<ID=chr3>\n"));
    }

    #[tokio::test]
    async fn test_idempotent_output() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("mutect2.vcf", MUTECT2))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE))
            .with_input(Caller::VarscanSnvs, fx.input("varscan.snp.vcf", VARSCAN_SNVS));

        let first = SomaticCombiner::new(config.clone()).run().await.unwrap();
        let first_bytes = std::fs::read(&first.output).unwrap();
        let second = SomaticCombiner::new(config.with_threads(1)).run().await.unwrap();
        let second_bytes = std::fs::read(&second.output).unwrap();

        assert_eq!(first_bytes, second_bytes);
    }

    #[tokio::test]
    async fn test_ordering_quorum_and_af_bounds() {
        let fx = Fixture::new();
        let mutect2 = [
            "chrX\t10\t.\tA\tC\t.\tPASS\t.\tGT:AF:DP\t0/0:0:10\t0/1:0.1:10",
            "chr10\t5\t.\tA\tC\t.\tPASS\t.\tGT:AF:DP\t0/0:0:10\t0/1:0.2:10",
            "chr2\t300\t.\tA\tC\t.\tPASS\t.\tGT:AF:DP\t0/0:0:10\t0/1:0.9:10",
            "chr2\t30\t.\tA\tC\t.\tPASS\t.\tGT:AF:DP\t0/0:0:10\t0/1:0.4:10",
        ];
        let varscan = [
            "chr2\t30\t.\tA\tC\t.\tPASS\t.\tGT:DP:FREQ\t0/0:10:0%\t0/1:10:20%",
            "chr2\t300\t.\tA\tC\t.\tPASS\t.\tGT:DP:FREQ\t0/0:10:0%\t0/1:10:10%",
            "chr10\t5\t.\tA\tC\t.\tPASS\t.\tGT:DP:FREQ\t0/0:10:0%\t0/1:10:30%",
            "chrX\t10\t.\tA\tC\t.\tPASS\t.\tGT:DP:FREQ\t0/0:10:0%\t0/1:10:50%",
            "chr1\t1\t.\tA\tC\t.\tPASS\t.\tGT:DP:FREQ\t0/0:10:0%\t0/1:10:50%",
        ];

        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("m.vcf", &mutect2))
            .with_input(Caller::VarscanSnvs, fx.input("v.vcf", &varscan));
        let report = SomaticCombiner::new(config).run().await.unwrap();
        let lines = data_lines(&report.output);

        let keys: Vec<VariantKey> = lines
            .iter()
            .map(|l| {
                let cols: Vec<&str> = l.split('\t').collect();
                VariantKey::new(cols[0], cols[1].parse().unwrap(), cols[3], cols[4])
            })
            .collect();
        assert_eq!(keys.len(), 4);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys[0].chromosome, "chr2");
        assert_eq!(keys[3].chromosome, "chrX");

        let bounds = [(0.2, 0.4), (0.1, 0.9), (0.2, 0.3), (0.1, 0.5)];
        for (line, (lo, hi)) in lines.iter().zip(bounds) {
            let cols: Vec<&str> = line.split('\t').collect();
            assert!(cols[7].starts_with("CC=2;"));
            let af: f64 = cols[9].split(':').nth(1).unwrap().parse().unwrap();
            assert!(af >= lo && af <= hi, "{} outside [{}, {}]", af, lo, hi);
        }
    }

    #[tokio::test]
    async fn test_duplicate_line_last_wins() {
        let fx = Fixture::new();
        let mutect2 = [
            "chr1\t100000\t.\tA\tT\t.\tPASS\t.\tGT:AF:DP\t0/0:0:50\t0/1:0.3:40",
            "chr1\t100000\t.\tA\tT\t.\tPASS\t.\tGT:AF:DP\t0/0:0:50\t0/1:0.3:80",
        ];
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("m.vcf", &mutect2))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        let lines = data_lines(&report.output);
        let line = find_line(&lines, "chr1\t100000\t").unwrap();

        assert!(line.contains("CC=2;"));
        assert!(line.ends_with("\t0/1:0.4:70.0:."));
    }

    #[tokio::test]
    async fn test_failed_caller_is_reported_and_skipped() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("mutect2.vcf", MUTECT2))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE))
            .with_input(Caller::StrelkaSnvs, fx.inputs.path().join("missing.vcf"));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        assert_eq!(report.callers_failed, vec![Caller::StrelkaSnvs]);

        let text = std::fs::read_to_string(&report.output).unwrap();
        assert!(text.contains("##combinerCallers=mutect2,muse\n"));

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.summary).unwrap()).unwrap();
        assert_eq!(summary["callers"][2]["caller"], "strelka-snvs");
        assert_eq!(summary["callers"][2]["status"], "failed");
        assert_eq!(summary["emitted"], 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped_not_fatal() {
        let fx = Fixture::new();
        let mutect2 = fx.input("mutect2.vcf", &[]);
        let mut bytes = std::fs::read(&mutect2).unwrap();
        bytes.extend_from_slice(
            b"chr1\t150\t.\tC\tG\t.\tPASS\tNOTE=\xff\xfe\tGT:AF:DP\t0/0:0.0:30\t0/1:0.2:30\n",
        );
        bytes.extend_from_slice(
            b"chr1\t200\t.\tA\tT\t.\tPASS\tDP=60\tGT:AF:DP\t0/0:0.0:30\t0/1:0.2:30\n",
        );
        std::fs::write(&mutect2, bytes).unwrap();

        let muse = fx.input(
            "muse.vcf",
            &["chr1\t200\t.\tA\tT\t.\tPASS\tSOMATIC\tGT:DP:AD\t0/0:30:30,0\t0/1:30:20,10"],
        );

        let config = fx
            .config()
            .with_input(Caller::Mutect2, mutect2)
            .with_input(Caller::Muse, muse);

        let report = SomaticCombiner::new(config).run().await.unwrap();
        assert_eq!(report.callers_used, vec![Caller::Mutect2, Caller::Muse]);
        assert!(report.callers_failed.is_empty());
        assert_eq!(report.emitted, 1);

        let lines = data_lines(&report.output);
        assert!(find_line(&lines, "chr1\t200\t.\tA\tT\t").unwrap().contains("CC=2;"));

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.summary).unwrap()).unwrap();
        assert_eq!(summary["callers"][0]["stats"]["malformed"], 1);
        assert_eq!(summary["callers"][0]["stats"]["accepted"], 1);
    }

    #[tokio::test]
    async fn test_all_inputs_failed_is_fatal() {
        let fx = Fixture::new();
        let bad = fx.inputs.path().join("broken.vcf");
        std::fs::write(&bad, "not a vcf\n").unwrap();

        let config = fx
            .config()
            .with_input(Caller::Mutect2, bad)
            .with_input(Caller::Muse, fx.inputs.path().join("missing.vcf"));

        let result = SomaticCombiner::new(config).run().await;
        assert!(matches!(result, Err(MergeError::AllInputsFailed(2))));
        assert!(!fx.output.path().join("merged/sample1.vcf").exists());
    }

    #[tokio::test]
    async fn test_no_inputs_writes_empty_consensus() {
        let fx = Fixture::new();
        let report = SomaticCombiner::new(fx.config()).run().await.unwrap();

        assert!(data_lines(&report.output).is_empty());
        let text = std::fs::read_to_string(&report.output).unwrap();
        assert!(text.contains("##combinerCallers=.\n"));
    }

    #[tokio::test]
    async fn test_invalid_configuration() {
        let fx = Fixture::new();
        let config = MergeConfig::new(fx.output.path(), "a/b");

        let result = SomaticCombiner::new(config).run().await;
        assert!(matches!(
            result,
            Err(MergeError::Configuration(ConfigError::InvalidId(_)))
        ));
    }

    #[tokio::test]
    async fn test_unusable_output_directory() {
        let fx = Fixture::new();
        let blocker = fx.output.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let config = MergeConfig::new(blocker.join("out"), "sample1");
        let result = SomaticCombiner::new(config).run().await;
        assert!(matches!(result, Err(MergeError::OutputDirectory { .. })));
    }

    #[tokio::test]
    async fn test_keep_filtered_and_compress() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .with_input(Caller::Mutect2, fx.input("Tumor.mutect2.vcf", MUTECT2))
            .with_input(Caller::Muse, fx.input("Tumor.muse.vcf", MUSE))
            .with_keep_filtered(true)
            .with_compress(true);

        let report = SomaticCombiner::new(config).run().await.unwrap();
        assert_eq!(report.output, fx.output.path().join("merged/sample1.vcf.gz"));

        let filtered = fx.output.path().join("merged/Tumor.mutect2.filtered.vcf");
        let text = std::fs::read_to_string(filtered).unwrap();
        assert!(text.starts_with("##fileformat=VCFv4.2\n"));
        // The germline-filtered chr3:900 line is left out
        assert_eq!(data_lines(&fx.output.path().join("merged/Tumor.mutect2.filtered.vcf")).len(), 3);

        assert!(fx.output.path().join("merged/Tumor.muse.filtered.vcf").exists());
    }

    #[tokio::test]
    async fn test_strelka_inputs() {
        let fx = Fixture::new();
        let strelka = [
            "chr1\t100000\t.\tA\tT\t.\tPASS\tSOMATIC;SGT=AA->AT\tDP:AU:CU:GU:TU\t50:50,50:0,0:0,0:0,0\t40:30,30:0,0:0,0:10,10",
        ];
        let strelka_indels = [
            "chr1\t100000\t.\tA\tT\t.\tPASS\tSGT=ref->het\tDP:TAR:TIR\t50:50,50:0,0\t40:30,30:10,10",
            "chr2\t700\t.\tCA\tC\t.\tPASS\tSGT=ref->het\tDP:TAR:TIR\t50:50,50:0,0\t40:30,30:10,10",
        ];
        let config = fx
            .config()
            .with_input(Caller::StrelkaSnvs, fx.input("somatic.snvs.vcf", &strelka))
            .with_input(Caller::StrelkaIndels, fx.input("somatic.indels.vcf", &strelka_indels))
            .with_input(Caller::Muse, fx.input("muse.vcf", MUSE));

        let report = SomaticCombiner::new(config).run().await.unwrap();
        let lines = data_lines(&report.output);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("CC=3;CL=muse,strelka-snvs,strelka-indels;SOMATIC"));
        // GT 0/1 everywhere; AF mean of 0.5, 0.25, 0.25; DP mean of 60, 40, 40
        assert!(lines[0].ends_with("\t0/1:0.3333:46.6667:."));
    }
}

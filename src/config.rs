// ==============================================================================
// config.rs - Merge Run Configuration
// ==============================================================================
// Description: Caller inputs, per-caller FILTER policies and output settings
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Policy file format (JSON, every key optional):
//   {
//     "mutect2": ["PASS", "clustered_events"],
//     "muse": ["PASS", "Tier1", "Tier2"]
//   }
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consensus::MIN_SUPPORT;
use crate::models::{Caller, UnknownCallerError, CALLER_PRIORITY};

/// Upper bound on concurrently read caller files
pub const MAX_READERS: usize = CALLER_PRIORITY.len();

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Output id must not be empty")]
    EmptyId,

    #[error("Output id '{0}' must not contain path separators")]
    InvalidId(String),

    #[error("Caller {0} was given more than one input file")]
    DuplicateCaller(Caller),

    #[error("Minimum caller support must be at least 2 (got {0})")]
    InvalidMinSupport(usize),

    #[error("Failed to read policy file {path}: {source}")]
    PolicyIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid policy file {path}: {source}")]
    PolicyFormat {
        path: String,
        source: serde_json::Error,
    },

    #[error("Policy for {0} accepts no FILTER values")]
    EmptyPolicy(Caller),

    #[error("Filtered copies of {first} and {second} would both be written to {path}")]
    FilteredPathCollision {
        first: Caller,
        second: Caller,
        path: String,
    },

    #[error(transparent)]
    UnknownCaller(#[from] UnknownCallerError),
}

/// FILTER values a caller's record may carry and still be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    accepted: BTreeSet<String>,
}

impl FilterPolicy {
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: accepted.into_iter().map(Into::into).collect(),
        }
    }

    /// Default policy for a caller
    ///
    /// MuSE reports confidence tiers in FILTER; every tier is kept.
    pub fn default_for(caller: Caller) -> Self {
        match caller {
            Caller::Muse => Self::new(["PASS", "Tier1", "Tier2", "Tier3", "Tier4", "Tier5"]),
            Caller::Mutect2
            | Caller::StrelkaSnvs
            | Caller::StrelkaIndels
            | Caller::VarscanSnvs
            | Caller::VarscanIndels => Self::new(["PASS"]),
        }
    }

    /// True when every FILTER value is accepted
    pub fn accepts<'a, I>(&self, filters: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        filters.into_iter().all(|f| self.accepted.contains(f))
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// FILTER policy for every caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerPolicies {
    policies: BTreeMap<Caller, FilterPolicy>,
}

impl Default for CallerPolicies {
    fn default() -> Self {
        Self {
            policies: CALLER_PRIORITY
                .iter()
                .map(|&c| (c, FilterPolicy::default_for(c)))
                .collect(),
        }
    }
}

impl CallerPolicies {
    pub fn get(&self, caller: Caller) -> FilterPolicy {
        self.policies
            .get(&caller)
            .cloned()
            .unwrap_or_else(|| FilterPolicy::default_for(caller))
    }

    pub fn set(&mut self, caller: Caller, policy: FilterPolicy) {
        self.policies.insert(caller, policy);
    }

    /// Defaults overridden by the callers named in a JSON policy file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyIo {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json_str(&text).map_err(|e| match e {
            ConfigError::PolicyFormat { source, .. } => ConfigError::PolicyFormat {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let overrides: HashMap<String, Vec<String>> =
            serde_json::from_str(text).map_err(|source| ConfigError::PolicyFormat {
                path: "<inline>".to_string(),
                source,
            })?;

        let mut policies = Self::default();
        for (name, accepted) in overrides {
            let caller: Caller = name.parse()?;
            let policy = FilterPolicy::new(accepted);
            if policy.is_empty() {
                return Err(ConfigError::EmptyPolicy(caller));
            }
            policies.set(caller, policy);
        }

        Ok(policies)
    }
}

/// One caller's input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerInput {
    pub caller: Caller,
    pub path: PathBuf,
}

/// Everything one merge run needs
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Supplied caller files (absent callers are simply not listed)
    pub inputs: Vec<CallerInput>,

    /// Output directory, created if missing
    pub output_dir: PathBuf,

    /// Output base name (`<output_dir>/<id>.vcf`)
    pub id: String,

    /// Write `<id>.vcf.gz` instead of plain text
    pub compress: bool,

    /// Also write each caller's accepted lines to `<stem>.filtered.vcf`
    pub keep_filtered: bool,

    /// Tumor sample column name, if not inferable from the headers
    pub tumor_sample: Option<String>,

    /// Minimum number of supporting callers
    pub min_support: usize,

    /// Maximum number of caller files read concurrently
    pub threads: usize,

    pub policies: CallerPolicies,
}

impl MergeConfig {
    pub fn new(output_dir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            output_dir: output_dir.into(),
            id: id.into(),
            compress: false,
            keep_filtered: false,
            tumor_sample: None,
            min_support: MIN_SUPPORT,
            threads: MAX_READERS,
            policies: CallerPolicies::default(),
        }
    }

    /// Add a caller input
    pub fn with_input(mut self, caller: Caller, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(CallerInput {
            caller,
            path: path.into(),
        });
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_keep_filtered(mut self, keep: bool) -> Self {
        self.keep_filtered = keep;
        self
    }

    pub fn with_tumor_sample(mut self, name: Option<String>) -> Self {
        self.tumor_sample = name;
        self
    }

    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.clamp(1, MAX_READERS);
        self
    }

    pub fn with_policies(mut self, policies: CallerPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Inputs in caller priority order
    pub fn ordered_inputs(&self) -> Vec<CallerInput> {
        let mut inputs = self.inputs.clone();
        inputs.sort_by_key(|i| i.caller);
        inputs
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(ConfigError::InvalidId(self.id.clone()));
        }

        if self.min_support < MIN_SUPPORT {
            return Err(ConfigError::InvalidMinSupport(self.min_support));
        }

        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if !seen.insert(input.caller) {
                return Err(ConfigError::DuplicateCaller(input.caller));
            }
        }

        if self.keep_filtered {
            let mut targets: BTreeMap<PathBuf, Caller> = BTreeMap::new();
            for input in self.ordered_inputs() {
                let path = self.filtered_path(&input.path);
                if let Some(&first) = targets.get(&path) {
                    return Err(ConfigError::FilteredPathCollision {
                        first,
                        second: input.caller,
                        path: path.display().to_string(),
                    });
                }
                targets.insert(path, input.caller);
            }
        }

        Ok(())
    }

    /// Run summary path
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.summary.json", self.id.trim()))
    }

    /// Path for a caller's filtered copy (`<stem>.filtered.vcf`)
    pub fn filtered_path(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());

        let stem = [".vcf.gz", ".vcf.bgz", ".vcf"]
            .iter()
            .find_map(|ext| name.strip_suffix(ext))
            .unwrap_or(&name);

        self.output_dir.join(format!("{}.filtered.vcf", stem))
    }
}

// ==============================================================================
// parsers/vcf.rs - VCF file reader
// ==============================================================================
// Description: Lazy line reader for caller VCF files (plain or gzip/BGZF)
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================
// The header is validated with noodles-vcf. Data lines are split as text so a
// malformed line can be counted and skipped without giving up on the file.
// ==============================================================================

use flate2::read::MultiGzDecoder;
use noodles_vcf as vcf;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of fixed columns before FORMAT (CHROM..INFO)
pub const FIXED_COLUMNS: usize = 8;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// VCF parsing errors
///
/// The first group is file-level and ends the read; the line-level variants
/// are only ever counted and skipped by [`VcfReader`].
#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Failed to open VCF file: {0}")]
    FileOpenError(String),

    #[error("Failed to read VCF header: {0}")]
    HeaderError(String),

    #[error("Missing #CHROM header line")]
    MissingColumnHeader,

    #[error("No sample columns in VCF header")]
    NoSamples,

    #[error("Line {line}: expected {expected} tab-delimited columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid position '{value}'")]
    InvalidPosition { line: usize, value: String },

    #[error("Line {line}: missing {field} allele")]
    MissingAllele { line: usize, field: &'static str },

    #[error("Line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Parsed VCF header
#[derive(Debug, Clone)]
pub struct VcfHeader {
    /// All header lines as read, including the #CHROM line
    pub lines: Vec<String>,

    /// Contigs defined in the header (##contig lines)
    pub contigs: Vec<String>,

    /// Sample names from the #CHROM line
    pub samples: Vec<String>,

    /// `##tumor_sample=` value (written by Mutect2)
    pub tumor_sample: Option<String>,
}

impl VcfHeader {
    /// Parse header lines (every line up to and including #CHROM)
    pub fn parse(lines: Vec<String>) -> Result<Self, VcfParseError> {
        if !lines.last().is_some_and(|l| l.starts_with("#CHROM")) {
            return Err(VcfParseError::MissingColumnHeader);
        }

        let mut text = lines.join("\n");
        text.push('\n');

        let header = vcf::io::Reader::new(text.as_bytes())
            .read_header()
            .map_err(|e| VcfParseError::HeaderError(e.to_string()))?;

        let contigs = header.contigs().keys().map(|k| k.to_string()).collect();
        let samples = header.sample_names().iter().map(|s| s.to_string()).collect();

        let tumor_sample = lines
            .iter()
            .find_map(|l| l.strip_prefix("##tumor_sample="))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            lines,
            contigs,
            samples,
            tumor_sample,
        })
    }

    /// Expected number of tab-delimited columns in a data line
    pub fn column_count(&self) -> usize {
        if self.samples.is_empty() {
            FIXED_COLUMNS
        } else {
            FIXED_COLUMNS + 1 + self.samples.len()
        }
    }

    /// Index of a sample by name
    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == name)
    }

    /// Pick the tumor sample column
    ///
    /// Order: explicit name, `##tumor_sample=`, a column named TUMOR, the last column.
    pub fn tumor_index(&self, preferred: Option<&str>) -> Option<usize> {
        if self.samples.is_empty() {
            return None;
        }

        if let Some(name) = preferred {
            if let Some(idx) = self.sample_index(name) {
                return Some(idx);
            }
            let idx = self.fallback_tumor_index();
            warn!(
                "Tumor sample '{}' not in header; reading column '{}' instead",
                name, self.samples[idx]
            );
            return Some(idx);
        }

        Some(self.fallback_tumor_index())
    }

    /// `##tumor_sample=`, then a column named TUMOR, then the last column
    fn fallback_tumor_index(&self) -> usize {
        self.tumor_sample
            .as_deref()
            .and_then(|name| self.sample_index(name))
            .or_else(|| {
                self.samples
                    .iter()
                    .position(|s| s.eq_ignore_ascii_case("TUMOR"))
            })
            .unwrap_or(self.samples.len().saturating_sub(1))
    }
}

/// One data line split into columns
#[derive(Debug, Clone, PartialEq)]
pub struct VcfLine {
    /// 1-based line number in the file
    pub line_number: usize,

    /// Parsed POS column
    pub position: u64,

    columns: Vec<String>,
}

impl VcfLine {
    /// Split and check a raw data line against the expected column count
    pub fn parse(line: &str, line_number: usize, expected_columns: usize) -> Result<Self, VcfParseError> {
        let columns: Vec<String> = line.split('\t').map(str::to_string).collect();

        if columns.len() != expected_columns {
            return Err(VcfParseError::ColumnCount {
                line: line_number,
                expected: expected_columns,
                found: columns.len(),
            });
        }

        let position = columns[1]
            .trim()
            .parse::<u64>()
            .map_err(|_| VcfParseError::InvalidPosition {
                line: line_number,
                value: columns[1].clone(),
            })?;

        for (idx, field) in [(3, "REF"), (4, "ALT")] {
            let value = columns[idx].trim();
            if value.is_empty() || value == "." {
                return Err(VcfParseError::MissingAllele {
                    line: line_number,
                    field,
                });
            }
        }

        Ok(Self {
            line_number,
            position,
            columns,
        })
    }

    pub fn chromosome(&self) -> &str {
        &self.columns[0]
    }

    pub fn reference(&self) -> &str {
        self.columns[3].trim()
    }

    pub fn alternate(&self) -> &str {
        self.columns[4].trim()
    }

    /// FILTER values; a missing FILTER (".") reads as PASS
    pub fn filters(&self) -> Vec<&str> {
        match self.columns[6].trim() {
            "" | "." => vec!["PASS"],
            filter => filter.split(';').map(str::trim).collect(),
        }
    }

    /// True if the INFO column carries `key` as a flag or key=value entry
    pub fn info_flag(&self, key: &str) -> bool {
        self.info_entries().any(|(k, _)| k == key)
    }

    /// Value of an INFO key, None for flags, missing keys and "."
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info_entries()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v)
            .filter(|v| !v.is_empty() && *v != ".")
    }

    fn info_entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns[7]
            .split(';')
            .filter(|entry| !entry.is_empty() && *entry != ".")
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (entry, None),
            })
    }

    /// FORMAT keys, empty for sites-only files
    pub fn format_keys(&self) -> Vec<&str> {
        self.columns
            .get(FIXED_COLUMNS)
            .map(|f| f.split(':').collect())
            .unwrap_or_default()
    }

    /// Value of a FORMAT key for a sample, None when absent or "."
    ///
    /// Trailing FORMAT fields may be dropped from a sample column; those read as absent.
    pub fn sample_value(&self, sample: usize, key: &str) -> Option<&str> {
        let key_idx = self.format_keys().iter().position(|k| *k == key)?;
        let column = self.columns.get(FIXED_COLUMNS + 1 + sample)?;

        column
            .split(':')
            .nth(key_idx)
            .filter(|v| !v.is_empty() && *v != ".")
    }

    /// The line as it appeared in the file (without line terminator)
    pub fn to_line(&self) -> String {
        self.columns.join("\t")
    }
}

/// Lazy VCF reader over data lines
///
/// Iterating yields every well-formed data line. Lines with the wrong column
/// count, an unparsable position, a missing allele or invalid UTF-8 are skipped and counted
/// in [`VcfReader::malformed_count`]. Only I/O failures are yielded as errors.
pub struct VcfReader<R> {
    inner: R,
    header: VcfHeader,
    line_number: usize,
    malformed: usize,
    buf: Vec<u8>,
}

impl VcfReader<Box<dyn BufRead + Send>> {
    /// Open a VCF file from a path (.vcf or .vcf.gz, detected from content)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VcfParseError> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| VcfParseError::FileOpenError(format!("{}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(file);

        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        let inner: Box<dyn BufRead + Send> = if compressed {
            debug!("Reading {:?} as gzip", path);
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            Box::new(reader)
        };

        Self::new(inner)
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Read and validate the header from a buffered reader
    pub fn new(mut inner: R) -> Result<Self, VcfParseError> {
        let mut lines = Vec::new();
        let mut buf = String::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            if inner.read_line(&mut buf)? == 0 {
                break;
            }
            line_number += 1;

            let line = buf.trim_end_matches(['\n', '\r']);
            if line.starts_with("##") {
                lines.push(line.to_string());
            } else if line.starts_with("#CHROM") {
                lines.push(line.to_string());
                break;
            } else if !line.trim().is_empty() {
                return Err(VcfParseError::MissingColumnHeader);
            }
        }

        if lines.is_empty() {
            return Err(VcfParseError::HeaderError("file is empty".to_string()));
        }

        let header = VcfHeader::parse(lines)?;

        Ok(Self {
            inner,
            header,
            line_number,
            malformed: 0,
            buf: Vec::new(),
        })
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// Count of skipped malformed data lines so far
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Read the next well-formed data line
    pub fn read_line(&mut self) -> Result<Option<VcfLine>, VcfParseError> {
        let expected = self.header.column_count();

        loop {
            self.buf.clear();
            if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim_end_matches(['\n', '\r']),
                Err(_) => {
                    let e = VcfParseError::InvalidEncoding {
                        line: self.line_number,
                    };
                    warn!("Skipping malformed VCF line: {}", e);
                    self.malformed += 1;
                    continue;
                }
            };
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match VcfLine::parse(line, self.line_number, expected) {
                Ok(vcf_line) => return Ok(Some(vcf_line)),
                Err(e) => {
                    warn!("Skipping malformed VCF line: {}", e);
                    self.malformed += 1;
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<VcfLine, VcfParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}

// ==============================================================================
// validator.rs - Caller Input Validation
// ==============================================================================
// Description: Checks a caller VCF before parsing (size, type, format) and
//              fingerprints it for the output header
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use flate2::read::MultiGzDecoder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024; // 4 GB

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Input file not found: {0}")]
    NotFound(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid file type: {0} (expected .vcf, .vcf.gz or .vcf.bgz)")]
    InvalidExtension(String),

    #[error("Magic number mismatch for compressed file {0}")]
    MagicMismatch(String),

    #[error("VCF file is empty: {0}")]
    Empty(String),

    #[error("Invalid VCF format: missing fileformat header in {0}")]
    MissingFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A caller input that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub file_name: String,
    pub compressed: bool,
    pub size: u64,
    pub sha256: String,
}

pub struct InputValidator {
    max_file_size: u64,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    pub fn validate(&self, path: &Path) -> Result<ValidatedInput, ValidationError> {
        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ValidationError::NotAFile(display.clone()))?;

        info!("Validating input: {}", file_name);

        // 1. Existence and size
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ValidationError::NotFound(display.clone()),
            _ => ValidationError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::NotAFile(display));
        }
        let size = metadata.len();
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension (allowlist)
        let compressed = Self::compressed_extension(&file_name)
            .ok_or_else(|| ValidationError::InvalidExtension(file_name.clone()))?;
        debug!("Extension check passed (compressed: {})", compressed);

        // 3. Magic number
        if compressed && !Self::has_gzip_magic(path)? {
            return Err(ValidationError::MagicMismatch(file_name));
        }

        // 4. First line
        self.validate_vcf_format(path, compressed)?;
        debug!("Content validation passed");

        // 5. SHA-256
        let sha256 = compute_sha256(path)?;
        debug!("SHA-256: {}", sha256);

        Ok(ValidatedInput {
            path: path.to_path_buf(),
            file_name,
            compressed,
            size,
            sha256,
        })
    }

    /// Some(compressed?) for an allowed extension
    fn compressed_extension(file_name: &str) -> Option<bool> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".vcf.gz") || lower.ends_with(".vcf.bgz") {
            Some(true)
        } else if lower.ends_with(".vcf") {
            Some(false)
        } else {
            None
        }
    }

    fn has_gzip_magic(path: &Path) -> Result<bool, ValidationError> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; 3];
        match file.read_exact(&mut buffer) {
            Ok(()) => Ok(buffer == GZIP_MAGIC),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn validate_vcf_format(&self, path: &Path, compressed: bool) -> Result<(), ValidationError> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let first_line = reader
            .lines()
            .next()
            .ok_or_else(|| ValidationError::Empty(path.display().to_string()))??;

        if !first_line.starts_with("##fileformat=VCF") {
            return Err(ValidationError::MissingFileFormat(path.display().to_string()));
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex SHA-256 digest of a file
pub fn compute_sha256(path: &Path) -> Result<String, ValidationError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

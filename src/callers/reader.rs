// ==============================================================================
// callers/reader.rs - Filtered observation stream for one caller
// ==============================================================================
// Description: VCF reader + FILTER policy + caller adapter
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

use super::{adapter_for, CallerAdapter};
use crate::config::FilterPolicy;
use crate::models::{Caller, KeyedObservation, VariantKey};
use crate::parsers::{VcfHeader, VcfParseError, VcfReader};

/// Per-caller read counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    pub caller: Caller,

    /// Well-formed data lines seen
    pub records: usize,

    /// Lines that became observations
    pub accepted: usize,

    /// Lines rejected by FILTER policy or missing GT/DP
    pub filtered: usize,

    /// Lines skipped as malformed
    pub malformed: usize,
}

impl ReadStats {
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            records: 0,
            accepted: 0,
            filtered: 0,
            malformed: 0,
        }
    }
}

/// Lazy sequence of one caller's usable observations
pub struct CallerReader<R> {
    reader: VcfReader<R>,
    adapter: Box<dyn CallerAdapter>,
    policy: FilterPolicy,
    tumor: usize,
    stats: ReadStats,
    filtered_sink: Option<Box<dyn Write + Send>>,
}

impl CallerReader<Box<dyn BufRead + Send>> {
    /// Open a caller's VCF file
    pub fn open(
        caller: Caller,
        path: impl AsRef<Path>,
        policy: FilterPolicy,
        tumor_sample: Option<&str>,
    ) -> Result<Self, VcfParseError> {
        let reader = VcfReader::from_path(path)?;
        Self::new(caller, reader, policy, tumor_sample)
    }
}

impl<R: BufRead> CallerReader<R> {
    pub fn new(
        caller: Caller,
        reader: VcfReader<R>,
        policy: FilterPolicy,
        tumor_sample: Option<&str>,
    ) -> Result<Self, VcfParseError> {
        let header = reader.header();
        let tumor = header
            .tumor_index(tumor_sample)
            .ok_or(VcfParseError::NoSamples)?;

        debug!(
            "{}: using sample '{}' as tumor",
            caller, header.samples[tumor]
        );

        Ok(Self {
            reader,
            adapter: adapter_for(caller),
            policy,
            tumor,
            stats: ReadStats::new(caller),
            filtered_sink: None,
        })
    }

    /// Copy every accepted line, under the input's header, to `sink`
    pub fn with_filtered_sink(mut self, mut sink: Box<dyn Write + Send>) -> std::io::Result<Self> {
        for line in &self.reader.header().lines {
            writeln!(sink, "{}", line)?;
        }
        self.filtered_sink = Some(sink);
        Ok(self)
    }

    pub fn caller(&self) -> Caller {
        self.stats.caller
    }

    pub fn header(&self) -> &VcfHeader {
        self.reader.header()
    }

    /// Counters so far
    pub fn stats(&self) -> ReadStats {
        let mut stats = self.stats.clone();
        stats.malformed = self.reader.malformed_count();
        stats
    }

    /// Flush the filtered copy and return the final counters
    pub fn finish(mut self) -> Result<ReadStats, VcfParseError> {
        if let Some(sink) = self.filtered_sink.as_mut() {
            sink.flush()?;
        }
        Ok(self.stats())
    }

    fn next_observation(&mut self) -> Result<Option<KeyedObservation>, VcfParseError> {
        while let Some(line) = self.reader.read_line()? {
            self.stats.records += 1;

            let filters = line.filters();
            if !self.policy.accepts(filters.iter().copied()) {
                debug!(
                    "{} line {}: FILTER {} not accepted",
                    self.stats.caller,
                    line.line_number,
                    filters.join(";")
                );
                self.stats.filtered += 1;
                continue;
            }

            let observation = match self.adapter.observe(&line, self.tumor) {
                Ok(observation) => observation,
                Err(e) => {
                    debug!("{} line {}: rejected, {}", self.stats.caller, line.line_number, e);
                    self.stats.filtered += 1;
                    continue;
                }
            };

            if let Some(sink) = self.filtered_sink.as_mut() {
                writeln!(sink, "{}", line.to_line())?;
            }

            self.stats.accepted += 1;
            let key = VariantKey::new(
                line.chromosome(),
                line.position,
                line.reference(),
                line.alternate(),
            );
            return Ok(Some(KeyedObservation { key, observation }));
        }

        Ok(None)
    }
}

impl<R: BufRead> Iterator for CallerReader<R> {
    type Item = Result<KeyedObservation, VcfParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_observation().transpose()
    }
}

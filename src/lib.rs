// ==============================================================================
// lib.rs - Somatic Combiner Library
// ==============================================================================
// Description: Consensus merging of somatic variant calls from multiple callers
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod callers;
pub mod config;
pub mod consensus;
pub mod genotype_converter;
pub mod grouper;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod validator;

pub use config::MergeConfig;
pub use processor::{MergeError, MergeReport, SomaticCombiner};

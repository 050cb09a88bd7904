//! # Presentation
//!
//! Turns analytics reports into text tables for the terminal or dark-themed
//! HTML fragments for embedding. Nothing here computes; every figure arrives
//! already calculated and is only formatted.

pub mod format;
pub mod grid;
pub mod reports;

pub use grid::{Grid, OutputFormat};

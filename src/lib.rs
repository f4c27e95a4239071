//! `nmr-titration` library crate.
//!
//! Fits 1:1 host-guest association constants (Ka) to NMR titration data,
//! either one peak at a time or globally across peaks with a shared Ka.
//!
//! The binary (`titr`) is a thin wrapper around this library so the fitting
//! code is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod models;
pub mod plot;
pub mod report;

//! Turns traffic-count survey exports into styled intensity reports.
//!
//! The survey workbook is read into the [`grid`] model by [`reader`],
//! transformed section by section in [`formatter`] and written back by
//! [`output`].

pub mod config;
pub mod dictionary;
pub mod entry;
pub mod error;
pub mod formatter;
pub mod grid;
pub mod output;
pub mod progress;
pub mod reader;

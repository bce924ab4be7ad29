//! Survey sheet → report section pipeline.
//!
//! Each section runs `parse → extract → aggregate → layout → validate →
//! style` on one source sheet, see [`section`]. [`report`] discovers the
//! sections of a survey workbook and runs them in order; the class
//! breakdown in [`breakdown`] comes last.

pub mod aggregate;
pub mod breakdown;
pub mod extract;
pub mod header;
pub mod layout;
pub mod report;
pub mod section;
pub mod style;
pub mod summary;
pub mod types;
pub mod utility;
pub mod validate;

pub use report::{RunSummary, build_report};
pub use section::SectionContext;

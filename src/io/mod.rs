//! Input/output helpers.
//!
//! - CSV loading of point-in-time candidate rows (`rows`)
//! - run record export/import as JSON (`export`)

pub mod export;
pub mod rows;

pub use export::*;
pub use rows::*;

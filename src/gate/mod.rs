//! Admission and promotion gates.
//!
//! Both gates are pure functions over caller-supplied value objects:
//!
//! - `source`: scores a vendor and decides whether it is admitted at all
//! - `quality`: decides whether one batch from an admitted vendor may be promoted
//! - `budget`: refuses paid fetches once monthly spend passes the cap

pub mod budget;
pub mod quality;
pub mod source;

pub use budget::*;
pub use quality::*;
pub use source::*;

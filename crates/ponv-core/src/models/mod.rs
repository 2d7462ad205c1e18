//! Domain models for the PONV risk engine.

mod assessment;
mod drug;
mod labels;
mod log;

pub use assessment::*;
pub use drug::*;
pub use labels::*;
pub use log::*;

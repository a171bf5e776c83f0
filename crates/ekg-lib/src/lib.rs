pub mod conditioning;
pub mod config;
pub mod detectors;
pub mod dsp;
pub mod episodes;
pub mod error;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod signal;

pub use config::*;
pub use error::*;
pub use signal::*;

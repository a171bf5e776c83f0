//! Windowing of a conditioned signal, per-window classification through an
//! injected [`WindowClassifier`], and run-length merging of positive windows
//! into episodes.

pub mod aggregate;
pub mod classifier;
pub mod window;

pub use aggregate::*;
pub use classifier::*;
pub use window::*;

pub mod filters;
pub mod resample;

pub use filters::*;
pub use resample::*;

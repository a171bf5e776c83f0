pub mod csv;
pub mod text;
pub mod wfdb;

use serde::{Deserialize, Serialize};

/// Raw device samples together with the rate they were recorded at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecording {
    pub fs: f64,
    pub samples: Vec<f64>,
}

use super::window::Window;
use crate::error::{AnalysisError, AnalysisResult};

/// Capability that scores one fixed-length window with a probability in `[0, 1]`.
///
/// The aggregator owns its classifier from construction; implementations are
/// expected to be deterministic for a given window.
pub trait WindowClassifier {
    fn classify(&self, window: &Window<'_>) -> AnalysisResult<f64>;
}

impl<C: WindowClassifier + ?Sized> WindowClassifier for &C {
    fn classify(&self, window: &Window<'_>) -> AnalysisResult<f64> {
        (**self).classify(window)
    }
}

impl<C: WindowClassifier + ?Sized> WindowClassifier for Box<C> {
    fn classify(&self, window: &Window<'_>) -> AnalysisResult<f64> {
        (**self).classify(window)
    }
}

/// Adapts an infallible closure into a classifier.
#[derive(Debug, Clone, Copy)]
pub struct FnClassifier<F>(F);

pub fn classifier_fn<F>(f: F) -> FnClassifier<F>
where
    F: Fn(&Window<'_>) -> f64,
{
    FnClassifier(f)
}

impl<F> WindowClassifier for FnClassifier<F>
where
    F: Fn(&Window<'_>) -> f64,
{
    fn classify(&self, window: &Window<'_>) -> AnalysisResult<f64> {
        Ok((self.0)(window))
    }
}

/// Probabilities computed ahead of time, one per window index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecomputedProbabilities {
    values: Vec<f64>,
}

impl PrecomputedProbabilities {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl WindowClassifier for PrecomputedProbabilities {
    fn classify(&self, window: &Window<'_>) -> AnalysisResult<f64> {
        self.values
            .get(window.index)
            .copied()
            .ok_or_else(|| AnalysisError::Classifier {
                index: window.index,
                reason: format!("only {} probabilities supplied", self.values.len()),
            })
    }
}

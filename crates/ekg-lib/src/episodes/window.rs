use crate::{
    error::{AnalysisError, AnalysisResult},
    signal::{seconds_to_samples, Signal},
};

/// Read-only view of `samples[start..end]` of a signal.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// Position in the window sequence.
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub samples: &'a [f64],
}

impl Window<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Fixed-length windows advanced by `step` samples. Built only through
/// [`WindowPlan::new`], so both lengths are at least one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    len: usize,
    step: usize,
}

impl WindowPlan {
    /// `len = round(window_s * fs)`, `step = floor(len * (1 - overlap))`, at least one sample.
    pub fn new(fs: f64, window_s: f64, overlap: f64) -> AnalysisResult<Self> {
        let len = seconds_to_samples(window_s, fs);
        if len == 0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "window of {window_s} s at {fs} Hz holds no samples"
            )));
        }
        if !(0.0..1.0).contains(&overlap) {
            return Err(AnalysisError::InvalidParameter(format!(
                "overlap must lie in [0, 1), got {overlap}"
            )));
        }
        let step = ((len as f64 * (1.0 - overlap)).floor() as usize).max(1);
        Ok(Self { len, step })
    }

    /// Samples per window.
    pub fn window_len(&self) -> usize {
        self.len
    }
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of complete windows in `signal_len` samples; a partial tail is never counted.
    pub fn count(&self, signal_len: usize) -> usize {
        if signal_len < self.len {
            0
        } else {
            (signal_len - self.len) / self.step + 1
        }
    }

    pub fn windows<'a>(&self, signal: &'a Signal) -> impl Iterator<Item = Window<'a>> + 'a {
        let plan = *self;
        let data = signal.data();
        (0..plan.count(data.len())).map(move |index| {
            let start = index * plan.step;
            let end = start + plan.len;
            Window {
                index,
                start,
                end,
                samples: &data[start..end],
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_from_seconds() {
        let plan = WindowPlan::new(250.0, 10.0, 0.5).unwrap();
        assert_eq!((plan.window_len(), plan.step()), (2500, 1250));
        let plan = WindowPlan::new(250.0, 10.0, 0.0).unwrap();
        assert_eq!(plan.step(), 2500);
        let plan = WindowPlan::new(250.0, 10.0, 0.99999).unwrap();
        assert_eq!(plan.step(), 1);
        assert!(WindowPlan::new(250.0, 10.0, 1.0).is_err());
        assert!(WindowPlan::new(250.0, 0.001, 0.5).is_err());
    }

    #[test]
    fn partial_tail_is_discarded() {
        let plan = WindowPlan::new(250.0, 10.0, 0.5).unwrap();
        assert_eq!(plan.count(2499), 0);
        assert_eq!(plan.count(2500), 1);
        assert_eq!(plan.count(3749), 1);
        assert_eq!(plan.count(3750), 2);
        assert_eq!(plan.count(7500), 5);
    }

    #[test]
    fn windows_are_views_in_order() {
        let signal = Signal::new(1.0, (0..10).map(f64::from).collect()).unwrap();
        let plan = WindowPlan::new(1.0, 4.0, 0.25).unwrap();
        let windows: Vec<_> = plan.windows(&signal).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!((windows[2].index, windows[2].start, windows[2].end), (2, 6, 10));
        assert_eq!(windows[1].samples, &[3.0, 4.0, 5.0, 6.0]);
        assert!(windows.iter().all(|w| w.len() == 4));
    }
}

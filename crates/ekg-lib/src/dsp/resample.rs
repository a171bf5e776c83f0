use crate::error::{AnalysisError, AnalysisResult};
use realfft::{FftError, RealFftPlanner};

/// Number of output samples when moving `len` samples from `source_fs` to
/// `target_fs` while preserving the time span.
pub fn resampled_len(len: usize, source_fs: f64, target_fs: f64) -> usize {
    (len as f64 * target_fs / source_fs).round() as usize
}

/// Band-limited resampling through the real FFT.
///
/// The spectrum of `data` is truncated (or zero-padded) to `target_len` bins and
/// transformed back, which treats the input as one period of a periodic signal.
/// When the shared length is even, the Nyquist bin is doubled on downsampling and
/// halved on upsampling so that its energy is split/merged correctly.
pub fn resample_fft(data: &[f64], target_len: usize) -> AnalysisResult<Vec<f64>> {
    let n = data.len();
    if n == 0 || target_len == 0 {
        return Ok(Vec::new());
    }
    if target_len == n {
        return Ok(data.to_vec());
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let mut input = data.to_vec();
    let mut spectrum = forward.make_output_vec();
    forward.process(&mut input, &mut spectrum).map_err(fft_error)?;

    let inverse = planner.plan_fft_inverse(target_len);
    let mut bins = inverse.make_input_vec();
    let shared = n.min(target_len);
    let keep = shared / 2 + 1;
    bins[..keep].copy_from_slice(&spectrum[..keep]);
    if shared % 2 == 0 {
        let nyquist = shared / 2;
        if target_len < n {
            bins[nyquist] *= 2.0;
        } else {
            bins[nyquist] *= 0.5;
        }
    }
    bins[0].im = 0.0;
    if target_len % 2 == 0 {
        if let Some(last) = bins.last_mut() {
            last.im = 0.0;
        }
    }

    let mut output = inverse.make_output_vec();
    inverse.process(&mut bins, &mut output).map_err(fft_error)?;
    let scale = 1.0 / n as f64;
    output.iter_mut().for_each(|x| *x *= scale);
    Ok(output)
}

fn fft_error(err: FftError) -> AnalysisError {
    AnalysisError::InvalidInput(format!("resampling failed: {err}"))
}

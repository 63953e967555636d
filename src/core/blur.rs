use crate::config::BlurConfig;
use crate::core::FilterError;
use crate::core::decode::{AnalysisError, measure_all, open_gray};
use crate::core::report::{Pass, PassReport, Reason};
use crate::session::Session;
use image::GrayImage;
use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};
use std::ops::Range;
use std::path::Path;

/// Mean log-magnitude (`20·ln|x|`) of the image rebuilt from its spectrum
/// after the centred `2·window` square of low frequencies is zeroed.
///
/// Blurred images keep little beyond the low frequencies, so they score low.
/// Pixels whose reconstruction is exactly zero are left out of the mean; an
/// image with nothing left scores negative infinity.
pub fn sharpness(gray: &GrayImage, window: usize) -> f64 {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    if width == 0 || height == 0 {
        return f64::NEG_INFINITY;
    }

    let mut data: Vec<Complex64> = gray
        .as_raw()
        .iter()
        .map(|&v| Complex64::new(v as f64, 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    fft2(&mut planner, &mut data, width, height, FftDirection::Forward);
    suppress_low_frequencies(&mut data, width, height, window);
    fft2(&mut planner, &mut data, width, height, FftDirection::Inverse);

    // rustfft leaves the inverse unnormalised.
    let scale = (width * height) as f64;
    let (sum, count) = data
        .iter()
        .map(|c| 20.0 * (c.norm() / scale).ln())
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NEG_INFINITY
    } else {
        sum / count as f64
    }
}

/// In-place 2-D transform of a row-major `width × height` buffer.
fn fft2(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex64],
    width: usize,
    height: usize,
    direction: FftDirection,
) {
    planner.plan_fft(width, direction).process(data);

    let mut columns = transpose(data, width, height);
    planner.plan_fft(height, direction).process(&mut columns);
    data.copy_from_slice(&transpose(&columns, height, width));
}

fn transpose(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::default(); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

/// Zero the square `[c - window, c + window)` around the zero frequency, as
/// laid out after an fftshift, clamped to the spectrum.
fn suppress_low_frequencies(data: &mut [Complex64], width: usize, height: usize, window: usize) {
    let rows = centered_band(height, window);
    let cols = centered_band(width, window);
    for sy in rows {
        let y = unshift(sy, height);
        for sx in cols.clone() {
            data[y * width + unshift(sx, width)] = Complex64::default();
        }
    }
}

fn centered_band(len: usize, window: usize) -> Range<usize> {
    let center = len / 2;
    center.saturating_sub(window)..(center + window).min(len)
}

/// Index in the natural FFT layout of position `shifted` in the centred layout.
fn unshift(shifted: usize, len: usize) -> usize {
    (shifted + len - len / 2) % len
}

pub struct BlurDetector {
    config: BlurConfig,
}

impl BlurDetector {
    pub fn new(config: BlurConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, path: &Path) -> Result<f64, AnalysisError> {
        Ok(sharpness(&open_gray(path)?, self.config.window))
    }

    pub fn is_blurry(&self, score: f64) -> bool {
        score <= self.config.threshold
    }

    pub fn run(&self, dir: &Path, session: &mut Session) -> Result<PassReport, FilterError> {
        let target = self.config.target_dir_for(dir);
        let images = session.scan(dir)?;
        let mut report = PassReport::new(Pass::Blur, dir, &target, images.len());

        for (path, metric) in measure_all(&images, session, |p| self.measure(p))? {
            session.check_cancelled()?;
            match metric {
                Ok(score) => {
                    log::debug!("{} sharpness {:.4}", path.display(), score);
                    if self.is_blurry(score) {
                        report.flag(session, &path, Reason::Blurry { score });
                    }
                }
                Err(e) => report.record_unreadable(&path, &e),
            }
        }

        Ok(report)
    }
}

//! Skew estimation by Hough line voting.
//!
//! An inverted Otsu mask of the enhanced image votes in (rho, theta) space
//! with 1px / 1 degree resolution. The strongest local maxima above the vote
//! threshold are line candidates; their angles, measured from horizontal and
//! restricted to the acceptance window, are averaged into the estimate.

use super::threshold;
use crate::preprocessing::config::PipelineConfig;
use image::GrayImage;
use serde::Serialize;
use std::f32::consts::PI;

const ANGLE_STEPS: usize = 180;

/// A straight line in normal form: `x * cos(theta) + y * sin(theta) = rho`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCandidate {
    pub rho: f32,
    /// Angle of the line's normal, in radians, within `[0, pi)`.
    pub theta: f32,
    pub votes: u32,
}

impl LineCandidate {
    /// Rotation of the line itself away from horizontal, in degrees.
    /// Positive means the line falls to the right.
    pub fn rotation_degrees(&self) -> f32 {
        self.theta.to_degrees() - 90.0
    }
}

/// Dominant rotation of the text lines, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkewEstimate {
    degrees: f32,
    lines: usize,
}

impl SkewEstimate {
    pub fn new(degrees: f32) -> Self {
        Self { degrees, lines: 0 }
    }

    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    /// Number of line candidates averaged into this estimate.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewParams {
    pub vote_threshold: u32,
    pub max_lines: usize,
    pub max_angle_degrees: f32,
}

impl From<&PipelineConfig> for SkewParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            vote_threshold: config.hough_vote_threshold,
            max_lines: config.max_lines,
            max_angle_degrees: config.max_skew_degrees,
        }
    }
}

impl Default for SkewParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Estimate the skew of `image`, or `None` when no qualifying line exists.
pub fn estimate(image: &GrayImage, params: &SkewParams) -> Option<SkewEstimate> {
    // The mask lives only for this call
    let mask = threshold::ink_mask(image)?;
    let lines = detect_lines(&mask, params.vote_threshold);
    tracing::debug!("Hough voting found {} line candidates", lines.len());

    aggregate(&lines, params)
}

/// Mean rotation of the strongest `max_lines` candidates that fall inside
/// the acceptance window.
pub fn aggregate(lines: &[LineCandidate], params: &SkewParams) -> Option<SkewEstimate> {
    let angles: Vec<f32> = lines
        .iter()
        .take(params.max_lines)
        .map(LineCandidate::rotation_degrees)
        .filter(|angle| angle.abs() < params.max_angle_degrees)
        .collect();

    if angles.is_empty() {
        return None;
    }

    let degrees = angles.iter().sum::<f32>() / angles.len() as f32;
    Some(SkewEstimate {
        degrees,
        lines: angles.len(),
    })
}

/// Standard Hough transform over the non-zero pixels of `mask`.
///
/// Candidates are accumulator cells with more than `vote_threshold` votes
/// that dominate their four neighbours, sorted strongest first.
pub fn detect_lines(mask: &GrayImage, vote_threshold: u32) -> Vec<LineCandidate> {
    let (width, height) = mask.dimensions();
    let num_rho = ((width + height) * 2 + 1) as usize;
    let offset = (num_rho - 1) / 2;
    // One cell of padding on every side keeps the peak test branch-free
    let stride = num_rho + 2;

    let trig: Vec<(f32, f32)> = (0..ANGLE_STEPS)
        .map(|n| (n as f32 * PI / ANGLE_STEPS as f32).sin_cos())
        .collect();

    let mut accumulator = vec![0u32; (ANGLE_STEPS + 2) * stride];
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        let (xf, yf) = (x as f32, y as f32);
        for (n, &(sin, cos)) in trig.iter().enumerate() {
            let r = (xf * cos + yf * sin).round() as isize + offset as isize;
            accumulator[(n + 1) * stride + r as usize + 1] += 1;
        }
    }

    let mut peaks = Vec::new();
    for n in 0..ANGLE_STEPS {
        for r in 0..num_rho {
            let base = (n + 1) * stride + r + 1;
            let votes = accumulator[base];
            if votes > vote_threshold
                && votes > accumulator[base - 1]
                && votes >= accumulator[base + 1]
                && votes > accumulator[base - stride]
                && votes >= accumulator[base + stride]
            {
                peaks.push((base, n, r, votes));
            }
        }
    }

    peaks.sort_by(|a, b| b.3.cmp(&a.3).then(a.0.cmp(&b.0)));

    peaks
        .into_iter()
        .map(|(_, n, r, votes)| LineCandidate {
            rho: r as f32 - offset as f32,
            theta: n as f32 * PI / ANGLE_STEPS as f32,
            votes,
        })
        .collect()
}

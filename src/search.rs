use log::{debug, warn};

use crate::node::color::Color;
use crate::node::error::{SearchError, SearchWarning};
use crate::node::stats::ErrorMethod;
use crate::Quadtree;

/// Knobs of the adaptive threshold search.
///
/// The search is a plain proportional controller: after each build the
/// threshold is scaled by `1 + gain * (target - achieved)` and clamped to
/// the bounds. Compression ratio is a step function of the threshold, so
/// it can oscillate; only `max_iterations` guarantees termination.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchParams {
	/// Desired compression ratio, strictly between 0 and 1.
	pub target_ratio: f64,
	pub initial_threshold: f64,
	pub min_threshold: f64,
	pub max_threshold: f64,
	/// The search stops once `|achieved - target| < epsilon`.
	pub epsilon: f64,
	pub gain: f64,
	pub max_iterations: usize,
}

impl Default for SearchParams {
	fn default() -> Self {
		SearchParams {
			target_ratio: 0.5,
			initial_threshold: 10.,
			min_threshold: 0.01,
			// Largest possible channel variance is 127.5^2; give it headroom.
			max_threshold: 65025.,
			epsilon: 0.01,
			gain: 0.5,
			max_iterations: 20,
		}
	}
}

impl SearchParams {
	pub fn new(target_ratio: f64, initial_threshold: f64) -> Self {
		SearchParams { target_ratio, initial_threshold, ..Default::default() }
	}

	fn validate(&self) -> Result<(), SearchError> {
		if !(self.target_ratio > 0. && self.target_ratio < 1.) {
			return Err(SearchError::InvalidTarget(self.target_ratio));
		}
		let (min, max) = (self.min_threshold, self.max_threshold);
		if !(min >= 0. && min <= max) {
			return Err(SearchError::InvalidBounds { min, max });
		}
		if self.max_iterations == 0 {
			return Err(SearchError::NoIterations);
		}
		Ok(())
	}

	fn clamp(&self, threshold: f64) -> f64 {
		threshold.max(self.min_threshold).min(self.max_threshold)
	}
}

/// Result of a compression run: the final tree and how it was reached.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
	pub tree: Quadtree<Color>,
	/// Threshold `tree` was built with.
	pub threshold: f64,
	pub achieved_ratio: f64,
	/// Number of trees built.
	pub iterations: usize,
	/// Set when the target ratio wasn't met; `tree` is still usable.
	pub warning: Option<SearchWarning>,
}

impl SearchOutcome {
	pub fn converged(&self) -> bool {
		self.warning.is_none()
	}
}

/// Repeatedly rebuilds the tree for `img`, adjusting the threshold until
/// the compression ratio lands within `params.epsilon` of the target.
///
/// Running out of iterations is not an error: the last tree is returned
/// with a `SearchWarning::ConvergenceNotReached`.
pub fn search_threshold(
	img: &image::RgbImage,
	method: ErrorMethod,
	min_block_size: u32,
	params: &SearchParams
) -> Result<SearchOutcome, SearchError> {
	params.validate()?;
	let mut threshold = params.clamp(params.initial_threshold);
	let mut iterations = 0;
	loop {
		iterations += 1;
		let tree = Quadtree::<Color>::from_image(img, method, threshold, min_block_size)?;
		let achieved_ratio = tree.compression_ratio();
		debug!("iteration {}: threshold {:.4} gives {} nodes, ratio {:.4}",
			iterations, threshold, tree.node_count(), achieved_ratio);

		if (achieved_ratio - params.target_ratio).abs() < params.epsilon {
			return Ok(SearchOutcome { tree, threshold, achieved_ratio, iterations, warning: None });
		}
		if iterations >= params.max_iterations {
			let warning = SearchWarning::ConvergenceNotReached { threshold, achieved_ratio, iterations };
			warn!("{}", warning);
			return Ok(SearchOutcome { tree, threshold, achieved_ratio, iterations, warning: Some(warning) });
		}

		let delta = params.target_ratio - achieved_ratio;
		threshold = params.clamp(threshold * (1. + params.gain * delta));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noise(width: u32, height: u32) -> image::RgbImage {
		image::RgbImage::from_fn(width, height, |x, y| {
			let v = (x.wrapping_mul(2654435761) ^ y.wrapping_mul(40503)).wrapping_mul(97) >> 7;
			image::Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
		})
	}

	#[test]
	fn rejects_bad_params() {
		let img = noise(4, 4);
		let bad_target = SearchParams::new(1., 10.);
		assert_eq!(
			search_threshold(&img, ErrorMethod::Variance, 1, &bad_target),
			Err(SearchError::InvalidTarget(1.))
		);
		let bad_bounds = SearchParams { min_threshold: 5., max_threshold: 1., ..Default::default() };
		assert_eq!(
			search_threshold(&img, ErrorMethod::Variance, 1, &bad_bounds),
			Err(SearchError::InvalidBounds { min: 5., max: 1. })
		);
		let no_iterations = SearchParams { max_iterations: 0, ..Default::default() };
		assert_eq!(
			search_threshold(&img, ErrorMethod::Variance, 1, &no_iterations),
			Err(SearchError::NoIterations)
		);
		assert!(matches!(
			search_threshold(&image::RgbImage::new(0, 3), ErrorMethod::Variance, 1, &Default::default()),
			Err(SearchError::Analyze(_))
		));
	}

	#[test]
	fn unreachable_target_soft_fails() {
		// A uniform image is always a single leaf; a ratio of 0.1 is impossible.
		let img = image::RgbImage::from_pixel(16, 16, image::Rgb([40, 50, 60]));
		let params = SearchParams::new(0.1, 10.);
		let outcome = search_threshold(&img, ErrorMethod::Variance, 1, &params).unwrap();
		assert!(!outcome.converged());
		assert_eq!(outcome.iterations, 20);
		assert_eq!(outcome.tree.node_count(), 1);
		assert_eq!(outcome.threshold, params.min_threshold);
		assert_eq!(outcome.warning, Some(SearchWarning::ConvergenceNotReached {
			threshold: outcome.threshold,
			achieved_ratio: outcome.achieved_ratio,
			iterations: 20,
		}));
	}

	#[test]
	fn threshold_stays_in_bounds() {
		let img = noise(32, 32);
		let params = SearchParams {
			target_ratio: 0.99,
			min_threshold: 1.,
			max_threshold: 50.,
			max_iterations: 5,
			..Default::default()
		};
		let outcome = search_threshold(&img, ErrorMethod::Variance, 1, &params).unwrap();
		assert!(outcome.threshold >= 1. && outcome.threshold <= 50.);
		assert!(outcome.iterations <= 5);
	}
}

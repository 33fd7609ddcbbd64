use crate::node::color::Color;
use crate::node::error::SearchError;
use crate::node::stats::ErrorMethod;
use crate::search::{search_threshold, SearchOutcome, SearchParams};
use crate::Quadtree;

/// Everything the caller decides about a compression run.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressionConfig {
	pub method: ErrorMethod,
	/// Error above which a block is subdivided; the starting point of the
	/// search when `target_ratio` is set.
	pub threshold: f64,
	pub min_block_size: u32,
	/// Enables the adaptive threshold search.
	pub target_ratio: Option<f64>,
	/// Build sibling quadrants concurrently. Only applies without a target
	/// ratio.
	pub parallel: bool,
}

impl Default for CompressionConfig {
	fn default() -> Self {
		CompressionConfig {
			method: ErrorMethod::Variance,
			threshold: 10.,
			min_block_size: 1,
			target_ratio: None,
			parallel: false,
		}
	}
}

impl CompressionConfig {
	/// Sets the target ratio the way the command line does: 0 disables
	/// the adaptive search.
	pub fn with_target_ratio(mut self, ratio: f64) -> Self {
		self.target_ratio = if ratio == 0. { None } else { Some(ratio) };
		self
	}

	/// Search parameters for this config, if a target ratio is set.
	pub fn search_params(&self) -> Option<SearchParams> {
		self.target_ratio.map(|r| SearchParams::new(r, self.threshold))
	}

	/// Compresses `img`, running the adaptive search if a target ratio is
	/// set and a single build otherwise.
	pub fn compress(&self, img: &image::RgbImage) -> Result<SearchOutcome, SearchError> {
		if let Some(params) = self.search_params() {
			return search_threshold(img, self.method, self.min_block_size, &params);
		}
		let tree = if self.parallel {
			Quadtree::<Color>::from_image_parallel(img, self.method, self.threshold, self.min_block_size)?
		} else {
			Quadtree::<Color>::from_image(img, self.method, self.threshold, self.min_block_size)?
		};
		Ok(SearchOutcome {
			achieved_ratio: tree.compression_ratio(),
			tree,
			threshold: self.threshold,
			iterations: 1,
			warning: None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_ratio_disables_search() {
		let config = CompressionConfig::default().with_target_ratio(0.);
		assert_eq!(config.search_params(), None);
		let config = config.with_target_ratio(0.25);
		assert_eq!(config.search_params(), Some(SearchParams::new(0.25, 10.)));
	}

	#[test]
	fn single_build_without_target() {
		let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
		let outcome = CompressionConfig::default().compress(&img).unwrap();
		assert!(outcome.converged());
		assert_eq!(outcome.iterations, 1);
		assert_eq!(outcome.threshold, 10.);
		assert_eq!(outcome.tree.node_count(), 1);
	}
}

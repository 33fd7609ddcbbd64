use super::color::{Color, Mono, MonoImage, NodeColor};
use super::error::AnalyzeError;
use super::stats::ErrorMethod;
use super::{Content, QuadtreeNode, Region};

use crate::Quadtree;

impl<C: NodeColor> QuadtreeNode<C> {
	/// Paints this node and its "branches" and "leaves" into `img`.
	///
	/// Each leaf fills the in-bounds part of its region with its color;
	/// branch nodes only recurse. Nothing is allocated.
	pub fn to_image(&self, img: &mut image::RgbImage) {
		match &self.content {
			Content::Leaf(c) => {
				let color = c.to_rgb();
				let (x_end, y_end) = self.region.clip(img.width(), img.height());
				for y in self.region.y..y_end {
					for x in self.region.x..x_end {
						img.put_pixel(x, y, color);
					}
				}
			},
			Content::Sections(sects) => {
				for section in sects.iter() {
					section.to_image(img);
				}
			}
		}
	}
}

/// Wraps a raw `width * height * 3` RGB buffer as an image.
pub fn rgb_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<image::RgbImage, AnalyzeError> {
	if width == 0 || height == 0 {
		return Err(AnalyzeError::EmptyImage { width, height });
	}
	let expected = width as usize * height as usize * 3;
	if data.len() != expected {
		return Err(AnalyzeError::BufferSize { expected, actual: data.len() });
	}
	let actual = data.len();
	image::RgbImage::from_raw(width, height, data)
		.ok_or(AnalyzeError::BufferSize { expected, actual })
}

fn validate(width: u32, height: u32, min_block_size: u32) -> Result<(), AnalyzeError> {
	if width == 0 || height == 0 {
		return Err(AnalyzeError::EmptyImage { width, height });
	}
	if min_block_size == 0 {
		return Err(AnalyzeError::ZeroMinBlockSize);
	}
	Ok(())
}

impl Quadtree<Color> {
	/// Analyzes a traditional image into a quadtree.
	///
	/// See `QuadtreeNode::build` for the meaning of `threshold`,
	/// `min_block_size` and `method`.
	pub fn from_image(
		img: &image::RgbImage,
		method: ErrorMethod,
		threshold: f64,
		min_block_size: u32
	) -> Result<Self, AnalyzeError> {
		Self::analyze(img, method, threshold, min_block_size, QuadtreeNode::<Color>::build)
	}

	/// `from_image`, building sibling quadrants in parallel.
	pub fn from_image_parallel(
		img: &image::RgbImage,
		method: ErrorMethod,
		threshold: f64,
		min_block_size: u32
	) -> Result<Self, AnalyzeError> {
		Self::analyze(img, method, threshold, min_block_size, QuadtreeNode::<Color>::build_parallel)
	}

	fn analyze<F>(
		img: &image::RgbImage,
		method: ErrorMethod,
		threshold: f64,
		min_block_size: u32,
		build: F
	) -> Result<Self, AnalyzeError>
	where F: Fn(&image::RgbImage, Region, f64, u32, ErrorMethod) -> QuadtreeNode<Color> {
		validate(img.width(), img.height(), min_block_size)?;
		if threshold.is_nan() || threshold < 0. {
			return Err(AnalyzeError::InvalidThreshold(threshold));
		}
		let region = Region::working(img.width(), img.height());
		let root = build(img, region, threshold, min_block_size, method);
		Ok(Self::with_root(img.width(), img.height(), root))
	}
}

impl Quadtree<Mono> {
	/// Analyzes a binary image into a quadtree of uniform blocks.
	pub fn from_bitmap(img: &MonoImage, min_block_size: u32) -> Result<Self, AnalyzeError> {
		validate(img.width(), img.height(), min_block_size)?;
		let root = QuadtreeNode::<Mono>::build_mono(img, Region::working(img.width(), img.height()), min_block_size);
		Ok(Self::with_root(img.width(), img.height(), root))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn paints_only_in_bounds() {
		let node = QuadtreeNode::branch(Region::new(0, 0, 4), [
			QuadtreeNode::leaf(Region::new(0, 0, 2), image::Rgb([1, 1, 1])),
			QuadtreeNode::leaf(Region::new(2, 0, 2), image::Rgb([2, 2, 2])),
			QuadtreeNode::leaf(Region::new(0, 2, 2), image::Rgb([3, 3, 3])),
			QuadtreeNode::leaf(Region::new(2, 2, 2), image::Rgb([4, 4, 4])),
		]);
		let mut img = image::RgbImage::new(3, 3);
		node.to_image(&mut img);
		assert_eq!(img.get_pixel(1, 1), &image::Rgb([1, 1, 1]));
		assert_eq!(img.get_pixel(2, 0), &image::Rgb([2, 2, 2]));
		assert_eq!(img.get_pixel(0, 2), &image::Rgb([3, 3, 3]));
		assert_eq!(img.get_pixel(2, 2), &image::Rgb([4, 4, 4]));
	}

	#[test]
	fn raw_buffer_validation() {
		assert_eq!(
			rgb_from_raw(0, 4, Vec::new()),
			Err(AnalyzeError::EmptyImage { width: 0, height: 4 })
		);
		assert_eq!(
			rgb_from_raw(2, 2, vec![0; 11]),
			Err(AnalyzeError::BufferSize { expected: 12, actual: 11 })
		);
		let img = rgb_from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
		assert_eq!(img.get_pixel(1, 0), &image::Rgb([4, 5, 6]));
	}

	#[test]
	fn rejects_bad_parameters() {
		let img = image::RgbImage::new(4, 4);
		assert_eq!(
			Quadtree::<Color>::from_image(&img, ErrorMethod::Variance, 1., 0),
			Err(AnalyzeError::ZeroMinBlockSize)
		);
		assert_eq!(
			Quadtree::<Color>::from_image(&img, ErrorMethod::Variance, -1., 1),
			Err(AnalyzeError::InvalidThreshold(-1.))
		);
		assert!(Quadtree::<Color>::from_image(&img, ErrorMethod::Variance, f64::NAN, 1).is_err());
		assert_eq!(
			Quadtree::<Mono>::from_bitmap(&MonoImage::new(0, 0), 1),
			Err(AnalyzeError::EmptyImage { width: 0, height: 0 })
		);
	}

	#[test]
	fn mono_reconstruction_is_exact() {
		let mut img = MonoImage::new(5, 3);
		img.set(4, 2, true);
		img.set(0, 0, true);
		img.set(1, 0, true);
		let tree = Quadtree::<Mono>::from_bitmap(&img, 1).unwrap();
		assert_eq!(tree.to_image(), img.to_rgb());
	}
}

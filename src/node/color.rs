use bitvec::order::Msb0;
use bitvec::vec::BitVec;

use super::error::DecodeError;

pub type Color = image::Rgb<u8>;

/// Leaf marker of the RGB variant; three channel bytes follow it.
pub const RGB_LEAF_MARKER: u8 = 0x00;
/// Marker of an RGB node with four subsections.
pub const RGB_SPLIT_MARKER: u8 = 0x01;

/// Marker of a uniformly white monochrome leaf.
pub const MONO_WHITE_MARKER: u8 = b'W';
/// Marker of a uniformly black monochrome leaf.
pub const MONO_BLACK_MARKER: u8 = b'B';
/// Marker of a mixed monochrome node with four subsections.
pub const MONO_SPLIT_MARKER: u8 = b'M';

/// Trait for the color types a quadtree leaf can carry, describing how
/// each one is laid out in the QTC byte stream.
pub trait NodeColor: Copy + PartialEq + std::fmt::Debug {
	/// Identifies the variant in QTC headers.
	const VARIANT: u8;
	/// Marker byte that introduces a node with four subsections.
	const SPLIT_MARKER: u8;
	/// Number of bytes a leaf occupies in the stream, marker included.
	const LEAF_LEN: usize;

	/// Appends the leaf marker and any color bytes.
	fn encode_leaf(&self, buffer: &mut Vec<u8>);
	/// Parses a leaf whose marker sits at `stream[offset]`.
	///
	/// The caller has already checked that the marker byte exists and is
	/// not `SPLIT_MARKER`.
	fn decode_leaf(stream: &[u8], offset: usize) -> Result<Self, DecodeError>;
	/// The color painted into RGB output for this leaf.
	fn to_rgb(&self) -> Color;
}

impl NodeColor for Color {
	const VARIANT: u8 = 0;
	const SPLIT_MARKER: u8 = RGB_SPLIT_MARKER;
	const LEAF_LEN: usize = 4;

	fn encode_leaf(&self, buffer: &mut Vec<u8>) {
		buffer.push(RGB_LEAF_MARKER);
		buffer.extend_from_slice(&self.0);
	}

	fn decode_leaf(stream: &[u8], offset: usize) -> Result<Self, DecodeError> {
		if stream[offset] != RGB_LEAF_MARKER {
			return Err(DecodeError::InvalidMarker { marker: stream[offset], offset });
		}
		match stream.get(offset + 1..offset + Self::LEAF_LEN) {
			Some(c) => Ok(image::Rgb([c[0], c[1], c[2]])),
			None => Err(DecodeError::InsufficientData { offset: stream.len() }),
		}
	}

	fn to_rgb(&self) -> Color {
		*self
	}
}

/// Color of a uniform block in a binary image.
///
/// Mixed blocks never become leaves unless they hit the minimum block
/// size, so the third "mixed" state only exists as `MONO_SPLIT_MARKER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mono {
	Black,
	White,
}

impl NodeColor for Mono {
	const VARIANT: u8 = 1;
	const SPLIT_MARKER: u8 = MONO_SPLIT_MARKER;
	const LEAF_LEN: usize = 1;

	fn encode_leaf(&self, buffer: &mut Vec<u8>) {
		buffer.push(match self {
			Mono::Black => MONO_BLACK_MARKER,
			Mono::White => MONO_WHITE_MARKER,
		});
	}

	fn decode_leaf(stream: &[u8], offset: usize) -> Result<Self, DecodeError> {
		match stream[offset] {
			MONO_BLACK_MARKER => Ok(Mono::Black),
			MONO_WHITE_MARKER => Ok(Mono::White),
			marker => Err(DecodeError::InvalidMarker { marker, offset }),
		}
	}

	fn to_rgb(&self) -> Color {
		match self {
			Mono::Black => image::Rgb([0; 3]),
			Mono::White => image::Rgb([255; 3]),
		}
	}
}

/// A binary image, one bit per pixel in row-major order (set = white).
#[derive(Clone, Debug, PartialEq)]
pub struct MonoImage {
	width: u32,
	height: u32,
	bits: BitVec<u8, Msb0>,
}

impl MonoImage {
	/// An all-black image.
	pub fn new(width: u32, height: u32) -> Self {
		MonoImage {
			width,
			height,
			bits: BitVec::repeat(false, width as usize * height as usize),
		}
	}

	/// Thresholds an RGB image on luminance: pixels at or above `cutoff`
	/// become white.
	pub fn from_rgb(img: &image::RgbImage, cutoff: u8) -> Self {
		let mut ret = Self::new(img.width(), img.height());
		for (x, y, pix) in img.enumerate_pixels() {
			ret.set(x, y, luminance(pix) >= cutoff);
		}
		ret
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// Whether the pixel at `(x, y)` is white. Panics if out of bounds.
	pub fn get(&self, x: u32, y: u32) -> bool {
		self.bits[self.index(x, y)]
	}

	pub fn set(&mut self, x: u32, y: u32, white: bool) {
		let ind = self.index(x, y);
		self.bits.set(ind, white);
	}

	/// Expands the bitmap into black and white RGB pixels.
	pub fn to_rgb(&self) -> image::RgbImage {
		image::RgbImage::from_fn(self.width, self.height, |x, y| {
			let c = if self.get(x, y) { Mono::White } else { Mono::Black };
			c.to_rgb()
		})
	}

	fn index(&self, x: u32, y: u32) -> usize {
		assert!(x < self.width && y < self.height, "pixel ({}, {}) out of bounds", x, y);
		y as usize * self.width as usize + x as usize
	}
}

/// Integer Rec. 601 luma.
fn luminance(pix: &Color) -> u8 {
	((299 * pix.0[0] as u32 + 587 * pix.0[1] as u32 + 114 * pix.0[2] as u32) / 1000) as u8
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rgb_leaf_layout() {
		let mut buf = Vec::new();
		image::Rgb([10u8, 20, 30]).encode_leaf(&mut buf);
		assert_eq!(buf, vec![RGB_LEAF_MARKER, 10, 20, 30]);
		assert_eq!(Color::decode_leaf(&buf, 0), Ok(image::Rgb([10, 20, 30])));
	}

	#[test]
	fn rgb_leaf_missing_channels() {
		let buf = [RGB_LEAF_MARKER, 10];
		assert_eq!(
			Color::decode_leaf(&buf, 0),
			Err(DecodeError::InsufficientData { offset: 2 })
		);
	}

	#[test]
	fn mono_rejects_unknown_marker() {
		assert_eq!(
			Mono::decode_leaf(b"BX", 1),
			Err(DecodeError::InvalidMarker { marker: b'X', offset: 1 })
		);
	}

	#[test]
	fn mono_image_from_rgb() {
		let mut img = image::RgbImage::new(3, 2);
		img.put_pixel(1, 0, image::Rgb([255, 255, 255]));
		img.put_pixel(2, 1, image::Rgb([200, 200, 10]));
		let mono = MonoImage::from_rgb(&img, 128);
		assert!(!mono.get(0, 0));
		assert!(mono.get(1, 0));
		assert!(mono.get(2, 1));
		assert_eq!(mono.to_rgb().get_pixel(1, 0), &image::Rgb([255, 255, 255]));
		assert_eq!(mono.to_rgb().get_pixel(0, 1), &image::Rgb([0, 0, 0]));
	}
}

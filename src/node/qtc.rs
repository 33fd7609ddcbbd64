use byteorder::{ByteOrder, LE};

use super::color::NodeColor;
use super::error::DecodeError;
use super::{Content, QuadtreeNode, Region};

/// Magic bytes at the start of every QTC file.
pub const QTC_MAGIC: &[u8; 6] = b"QuTrCm";
/// Current QTC container version.
pub const QTC_VERSION: u8 = 1;
/// Magic, version, variant, then width and height as little-endian `u32`s.
pub const QTC_HEADER_LEN: usize = 16;

/// Largest side whose next power of two still fits in a `u32`.
const MAX_SIDE: u32 = 1 << 31;

impl<C: NodeColor> QuadtreeNode<C> {
	/// Appends the node to `buffer` in preorder.
	///
	/// A leaf is written as its color's leaf marker plus any color bytes;
	/// a branch node is `C::SPLIT_MARKER` immediately followed by the
	/// encodings of its four subsections. There are no lengths anywhere.
	pub fn encode(&self, buffer: &mut Vec<u8>) {
		match &self.content {
			Content::Leaf(c) => c.encode_leaf(buffer),
			Content::Sections(sects) => {
				buffer.push(C::SPLIT_MARKER);
				for section in sects.iter() {
					section.encode(buffer);
				}
			}
		}
	}

	/// Parses one node covering `region` from `stream`, starting at byte
	/// `curr_ind`.
	///
	/// Successful return value also holds the index to which the parser
	/// has progressed, to assist with the recursive algorithm.
	///
	/// A split marker on a region of side 1 is rejected, since such a
	/// region can never be divided.
	pub fn decode(
		stream: &[u8],
		region: Region,
		mut curr_ind: usize
	) -> Result<(Self, usize), DecodeError> {
		let marker = *stream.get(curr_ind)
			.ok_or(DecodeError::InsufficientData { offset: curr_ind })?;
		if marker != C::SPLIT_MARKER {
			let color = C::decode_leaf(stream, curr_ind)?;
			return Ok((Self::leaf(region, color), curr_ind + C::LEAF_LEN));
		}
		if region.size < 2 {
			return Err(DecodeError::InvalidMarker { marker, offset: curr_ind });
		}
		curr_ind += 1;
		// Recursion
		let [nw, ne, sw, se] = region.quadrants();
		let (nw, curr_ind) = Self::decode(stream, nw, curr_ind)?;
		let (ne, curr_ind) = Self::decode(stream, ne, curr_ind)?;
		let (sw, curr_ind) = Self::decode(stream, sw, curr_ind)?;
		let (se, curr_ind) = Self::decode(stream, se, curr_ind)?;
		Ok((Self::branch(region, [nw, ne, sw, se]), curr_ind))
	}
}

impl<C: NodeColor> crate::Quadtree<C> {
	/// Encodes the tree as a bare node stream. The empty tree encodes to
	/// no bytes at all.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut ret = Vec::with_capacity(self.encoded_len());
		if let Some(root) = self.root() {
			root.encode(&mut ret);
		}
		ret
	}

	/// Decodes a bare node stream for an image of the given dimensions.
	///
	/// The stream must hold exactly one tree; bytes after it are an error.
	/// A tree needs nonzero dimensions whose working square fits in a
	/// `u32`, that is neither side above `2^31`.
	pub fn from_bytes(width: u32, height: u32, stream: &[u8]) -> Result<Self, DecodeError> {
		if width > MAX_SIDE || height > MAX_SIDE
			|| (!stream.is_empty() && (width == 0 || height == 0)) {
			return Err(DecodeError::InvalidDimensions { width, height });
		}
		if stream.is_empty() {
			return Ok(Self::empty(width, height));
		}
		let (root, end) = QuadtreeNode::decode(stream, Region::working(width, height), 0)?;
		if end != stream.len() {
			return Err(DecodeError::TrailingData { offset: end, count: stream.len() - end });
		}
		Ok(Self::with_root(width, height, root))
	}

	/// Encodes the tree with a QTC header carrying its dimensions.
	pub fn to_qtc(&self) -> Vec<u8> {
		let mut ret = Vec::with_capacity(QTC_HEADER_LEN + self.encoded_len());
		ret.extend_from_slice(QTC_MAGIC);
		ret.push(QTC_VERSION);
		ret.push(C::VARIANT);
		let mut dims = [0; 8];
		LE::write_u32(&mut dims[..4], self.width());
		LE::write_u32(&mut dims[4..], self.height());
		ret.extend_from_slice(&dims);
		if let Some(root) = self.root() {
			root.encode(&mut ret);
		}
		ret
	}

	/// Reads a QTC file holding a tree of color variant `C`.
	///
	/// Offsets in stream errors are relative to the end of the header.
	pub fn from_qtc(source: &[u8]) -> Result<Self, DecodeError> {
		let found = qtc_variant(source)?;
		if found != C::VARIANT {
			return Err(DecodeError::VariantMismatch { expected: C::VARIANT, found });
		}
		if source.len() < QTC_HEADER_LEN {
			return Err(DecodeError::InsufficientData { offset: source.len() });
		}
		let width = LE::read_u32(&source[8..12]);
		let height = LE::read_u32(&source[12..16]);
		Self::from_bytes(width, height, &source[QTC_HEADER_LEN..])
	}
}

/// Checks a QTC header and returns the color variant byte it names, so
/// callers can pick the matching `Quadtree` type.
pub fn qtc_variant(source: &[u8]) -> Result<u8, DecodeError> {
	// Verify header (version 1 is required for compatibility)
	if source.get(..QTC_MAGIC.len()) != Some(&QTC_MAGIC[..]) {
		return Err(DecodeError::MissingHeader);
	}
	match source.get(6) {
		Some(&QTC_VERSION) => (),
		Some(&v) => return Err(DecodeError::UnsupportedVersion(v)),
		None => return Err(DecodeError::InsufficientData { offset: 6 }),
	}
	source.get(7).copied().ok_or(DecodeError::InsufficientData { offset: 7 })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::color::{Color, Mono, RGB_LEAF_MARKER, RGB_SPLIT_MARKER};
	use crate::Quadtree;

	fn leaf(x: u32, y: u32, size: u32, c: [u8; 3]) -> QuadtreeNode<Color> {
		QuadtreeNode::leaf(Region::new(x, y, size), image::Rgb(c))
	}

	fn sample_tree() -> QuadtreeNode<Color> {
		QuadtreeNode::branch(Region::new(0, 0, 4), [
			leaf(0, 0, 2, [1, 2, 3]),
			QuadtreeNode::branch(Region::new(2, 0, 2), [
				leaf(2, 0, 1, [4, 5, 6]),
				leaf(3, 0, 1, [7, 8, 9]),
				leaf(2, 1, 1, [10, 11, 12]),
				leaf(3, 1, 1, [13, 14, 15]),
			]),
			leaf(0, 2, 2, [16, 17, 18]),
			leaf(2, 2, 2, [19, 20, 21]),
		])
	}

	#[test]
	fn preorder_layout() {
		let mut buf = Vec::new();
		sample_tree().encode(&mut buf);
		assert_eq!(buf.len(), sample_tree().encoded_len());
		assert_eq!(&buf[..6], &[RGB_SPLIT_MARKER, RGB_LEAF_MARKER, 1, 2, 3, RGB_SPLIT_MARKER]);
		assert_eq!(buf.len(), 2 + 7 * 4);
	}

	#[test]
	fn decode_inverts_encode() {
		let tree = sample_tree();
		let mut buf = Vec::new();
		tree.encode(&mut buf);
		let (decoded, end) = QuadtreeNode::<Color>::decode(&buf, Region::new(0, 0, 4), 0).unwrap();
		assert_eq!(decoded, tree);
		assert_eq!(end, buf.len());
	}

	#[test]
	fn truncated_branch_is_corrupt() {
		let mut buf = vec![RGB_SPLIT_MARKER];
		for _ in 0..3 {
			buf.extend_from_slice(&[RGB_LEAF_MARKER, 0, 0, 0]);
		}
		assert_eq!(
			Quadtree::<Color>::from_bytes(4, 4, &buf),
			Err(DecodeError::InsufficientData { offset: 13 })
		);
		assert_eq!(
			Quadtree::<Mono>::from_bytes(4, 4, b"MWBW"),
			Err(DecodeError::InsufficientData { offset: 4 })
		);
	}

	#[test]
	fn malformed_streams() {
		assert_eq!(
			Quadtree::<Color>::from_bytes(4, 4, &[0x07]),
			Err(DecodeError::InvalidMarker { marker: 0x07, offset: 0 })
		);
		assert_eq!(
			Quadtree::<Mono>::from_bytes(1, 1, b"MWWWW"),
			Err(DecodeError::InvalidMarker { marker: b'M', offset: 0 })
		);
		assert_eq!(
			Quadtree::<Mono>::from_bytes(2, 2, b"WB"),
			Err(DecodeError::TrailingData { offset: 1, count: 1 })
		);
	}

	#[test]
	fn qtc_container() {
		let tree = Quadtree::with_root(3, 4, sample_tree());
		let data = tree.to_qtc();
		assert_eq!(&data[..8], b"QuTrCm\x01\x00");
		assert_eq!(&data[8..16], &[3, 0, 0, 0, 4, 0, 0, 0]);
		assert_eq!(qtc_variant(&data), Ok(0));
		assert_eq!(Quadtree::<Color>::from_qtc(&data), Ok(tree));
		assert_eq!(
			Quadtree::<Mono>::from_qtc(&data),
			Err(DecodeError::VariantMismatch { expected: 1, found: 0 })
		);
	}

	#[test]
	fn qtc_bad_headers() {
		assert_eq!(qtc_variant(b"QuTr"), Err(DecodeError::MissingHeader));
		assert_eq!(qtc_variant(b"PNG\x89\x00\x00\x00\x00"), Err(DecodeError::MissingHeader));
		assert_eq!(qtc_variant(b"QuTrCm\x02\x00"), Err(DecodeError::UnsupportedVersion(2)));
		assert_eq!(
			Quadtree::<Mono>::from_qtc(b"QuTrCm\x01\x01\x02\x00"),
			Err(DecodeError::InsufficientData { offset: 10 })
		);
	}

	/// Header with the given dimensions followed by `stream`.
	fn qtc_with_dims(variant: u8, width: u32, height: u32, stream: &[u8]) -> Vec<u8> {
		let mut ret = QTC_MAGIC.to_vec();
		ret.push(QTC_VERSION);
		ret.push(variant);
		let mut dims = [0; 8];
		LE::write_u32(&mut dims[..4], width);
		LE::write_u32(&mut dims[4..], height);
		ret.extend_from_slice(&dims);
		ret.extend_from_slice(stream);
		ret
	}

	#[test]
	fn oversized_dimensions() {
		let source = qtc_with_dims(Color::VARIANT, 0x8000_0001, 1, &[RGB_LEAF_MARKER, 1, 2, 3]);
		assert_eq!(
			Quadtree::<Color>::from_qtc(&source),
			Err(DecodeError::InvalidDimensions { width: 0x8000_0001, height: 1 })
		);
		assert_eq!(
			Quadtree::<Mono>::from_bytes(1, u32::MAX, b""),
			Err(DecodeError::InvalidDimensions { width: 1, height: u32::MAX })
		);
		// The largest side still fits.
		let tree = Quadtree::<Mono>::from_bytes(1 << 31, 1, b"W").unwrap();
		assert_eq!(tree.root().unwrap().region, Region::new(0, 0, 1 << 31));
	}

	#[test]
	fn zero_dimensions() {
		let source = qtc_with_dims(Mono::VARIANT, 0, 0, b"W");
		assert_eq!(
			Quadtree::<Mono>::from_qtc(&source),
			Err(DecodeError::InvalidDimensions { width: 0, height: 0 })
		);
		assert_eq!(
			Quadtree::<Color>::from_bytes(5, 0, &[RGB_LEAF_MARKER, 0, 0, 0]),
			Err(DecodeError::InvalidDimensions { width: 5, height: 0 })
		);
		assert_eq!(Quadtree::<Mono>::from_bytes(0, 0, b""), Ok(Quadtree::empty(0, 0)));
	}
}

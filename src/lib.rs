//! Lossy quadtree image compression.
//!
//! An image is split into square blocks, and every block whose pixels vary
//! less than a threshold is collapsed into its mean color. The resulting
//! tree can be painted back into an image or stored as a compact,
//! self-delimiting byte stream (optionally inside a QTC file).

pub mod config;
pub mod node;
pub mod search;

pub use config::CompressionConfig;
pub use node::*;

use node::color::NodeColor;

/// A compressed image: its dimensions and the tree covering its working
/// square, if any.
///
/// Dropping the tree drops every node in it.
#[derive(Clone, Debug, PartialEq)]
pub struct Quadtree<C: NodeColor> {
	width: u32,
	height: u32,
	root: Option<QuadtreeNode<C>>,
}

impl<C: NodeColor> Quadtree<C> {
	/// A tree with no nodes.
	pub fn empty(width: u32, height: u32) -> Self {
		Quadtree { width, height, root: None }
	}

	/// Wraps a root node; its region should be `Region::working(width, height)`.
	pub fn with_root(width: u32, height: u32, root: QuadtreeNode<C>) -> Self {
		Quadtree { width, height, root: Some(root) }
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn root(&self) -> Option<&QuadtreeNode<C>> {
		self.root.as_ref()
	}

	pub fn node_count(&self) -> usize {
		self.root.as_ref().map_or(0, QuadtreeNode::node_count)
	}

	pub fn leaf_count(&self) -> usize {
		self.root.as_ref().map_or(0, QuadtreeNode::leaf_count)
	}

	pub fn branch_count(&self) -> usize {
		self.root.as_ref().map_or(0, QuadtreeNode::branch_count)
	}

	pub fn depth(&self) -> usize {
		self.root.as_ref().map_or(0, QuadtreeNode::depth)
	}

	/// Length of `to_bytes()`, computed without encoding.
	pub fn encoded_len(&self) -> usize {
		self.root.as_ref().map_or(0, QuadtreeNode::encoded_len)
	}

	/// Size of the uncompressed RGB pixel buffer.
	pub fn raw_len(&self) -> usize {
		self.width as usize * self.height as usize * 3
	}

	/// `1 - encoded_len / raw_len`: the fraction of the raw buffer saved
	/// by the node stream. Negative when the stream is the larger of the two.
	pub fn compression_ratio(&self) -> f64 {
		if self.raw_len() == 0 {
			return 0.;
		}
		1. - self.encoded_len() as f64 / self.raw_len() as f64
	}

	/// Reconstructs the (lossy) image. Pixels not covered by any leaf,
	/// which only happens for the empty tree, stay black.
	pub fn to_image(&self) -> image::RgbImage {
		let mut ret = image::RgbImage::new(self.width, self.height);
		if let Some(root) = &self.root {
			root.to_image(&mut ret);
		}
		ret
	}
}

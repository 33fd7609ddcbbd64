pub mod color;
pub mod error;
pub mod stats;

use color::{Color, Mono, MonoImage, NodeColor};
use stats::{BlockStatistics, ErrorMethod};

/// An axis-aligned square of the (power-of-two) working area.
///
/// Parts of a region may lie outside the actual image; those pixels are
/// simply skipped wherever the region is sampled or painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
	pub x: u32,
	pub y: u32,
	pub size: u32,
}

impl Region {
	pub fn new(x: u32, y: u32, size: u32) -> Self {
		Region { x, y, size }
	}

	/// The root region for an image: the smallest power-of-two square
	/// anchored at the origin that covers all of it.
	pub fn working(width: u32, height: u32) -> Self {
		Region::new(0, 0, width.max(height).next_power_of_two())
	}

	/// The four quadrants in NW, NE, SW, SE order.
	pub fn quadrants(&self) -> [Region; 4] {
		let half = self.size / 2;
		[
			Region::new(self.x, self.y, half),
			Region::new(self.x + half, self.y, half),
			Region::new(self.x, self.y + half, half),
			Region::new(self.x + half, self.y + half, half),
		]
	}

	/// Exclusive end coordinates of the part of the region inside a
	/// `width` by `height` image. Either end may be less than the start if
	/// the region lies entirely outside.
	pub fn clip(&self, width: u32, height: u32) -> (u32, u32) {
		(
			self.x.saturating_add(self.size).min(width),
			self.y.saturating_add(self.size).min(height),
		)
	}
}

/// What a node holds: a single color, or its four quadrants.
#[derive(Clone, Debug, PartialEq)]
pub enum Content<C: NodeColor> {
	Leaf(C),
	/// Subsections in NW, NE, SW, SE order.
	Sections(Box<[QuadtreeNode<C>; 4]>),
}

/// Node in a quadtree for storing an image.
///
/// A leaf covers its whole region with one color; a branch node splits the
/// region into four equal quadrants, each owned by exactly one subnode.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadtreeNode<C: NodeColor> {
	pub region: Region,
	pub content: Content<C>,
}

/// Whether a block of side `size` may be split without producing blocks
/// smaller than `min_block_size`.
fn can_split(size: u32, min_block_size: u32) -> bool {
	size > min_block_size && size / 2 >= min_block_size
}

impl<C: NodeColor> QuadtreeNode<C> {
	pub fn leaf(region: Region, color: C) -> Self {
		QuadtreeNode { region, content: Content::Leaf(color) }
	}

	pub fn branch(region: Region, sections: [QuadtreeNode<C>; 4]) -> Self {
		QuadtreeNode { region, content: Content::Sections(Box::new(sections)) }
	}

	pub fn is_leaf(&self) -> bool {
		matches!(self.content, Content::Leaf(_))
	}

	/// The leaf color, or `None` for a branch node.
	pub fn color(&self) -> Option<C> {
		match self.content {
			Content::Leaf(c) => Some(c),
			Content::Sections(_) => None,
		}
	}

	pub fn sections(&self) -> Option<&[QuadtreeNode<C>; 4]> {
		match &self.content {
			Content::Leaf(_) => None,
			Content::Sections(s) => Some(s),
		}
	}

	/// Total number of nodes, this one included.
	pub fn node_count(&self) -> usize {
		1 + self.sections()
			.map_or(0, |s| s.iter().map(QuadtreeNode::node_count).sum())
	}

	pub fn leaf_count(&self) -> usize {
		match self.sections() {
			None => 1,
			Some(s) => s.iter().map(QuadtreeNode::leaf_count).sum(),
		}
	}

	pub fn branch_count(&self) -> usize {
		self.node_count() - self.leaf_count()
	}

	/// Number of levels, counting a lone leaf as 1.
	pub fn depth(&self) -> usize {
		1 + self.sections()
			.map_or(0, |s| s.iter().map(QuadtreeNode::depth).max().unwrap_or(0))
	}

	/// Length in bytes of this node's QTC stream encoding.
	pub fn encoded_len(&self) -> usize {
		match self.sections() {
			None => C::LEAF_LEN,
			Some(s) => 1 + s.iter().map(QuadtreeNode::encoded_len).sum::<usize>(),
		}
	}

	/// Smallest region side length anywhere in the subtree.
	pub fn min_region_size(&self) -> u32 {
		match self.sections() {
			None => self.region.size,
			Some(s) => s.iter()
				.map(QuadtreeNode::min_region_size)
				.fold(self.region.size, u32::min),
		}
	}
}

impl QuadtreeNode<Color> {
	/// Recursively partitions `region` of `img`.
	///
	/// A region is split into quadrants when its error under `method`
	/// exceeds `threshold` and the quadrants would be no smaller than
	/// `min_block_size`; otherwise it becomes a leaf of its mean color.
	/// Regions wholly outside the image become black leaves.
	pub fn build(
		img: &image::RgbImage,
		region: Region,
		threshold: f64,
		min_block_size: u32,
		method: ErrorMethod
	) -> Self {
		let stats = BlockStatistics::compute(img, region);
		if stats.error(method) > threshold && can_split(region.size, min_block_size) {
			let [nw, ne, sw, se] = region.quadrants();
			let sub = |r| Self::build(img, r, threshold, min_block_size, method);
			Self::branch(region, [sub(nw), sub(ne), sub(sw), sub(se)])
		} else {
			Self::leaf(region, stats.average_color())
		}
	}

	/// Same as `build`, but the four quadrants of every split region are
	/// built concurrently on the `rayon` thread pool.
	///
	/// Produces exactly the tree `build` does.
	pub fn build_parallel(
		img: &image::RgbImage,
		region: Region,
		threshold: f64,
		min_block_size: u32,
		method: ErrorMethod
	) -> Self {
		let stats = BlockStatistics::compute(img, region);
		if stats.error(method) > threshold && can_split(region.size, min_block_size) {
			let [nw, ne, sw, se] = region.quadrants();
			let sub = |r| Self::build_parallel(img, r, threshold, min_block_size, method);
			let ((nw, ne), (sw, se)) = rayon::join(
				|| rayon::join(|| sub(nw), || sub(ne)),
				|| rayon::join(|| sub(sw), || sub(se)),
			);
			Self::branch(region, [nw, ne, sw, se])
		} else {
			Self::leaf(region, stats.average_color())
		}
	}
}

impl QuadtreeNode<Mono> {
	/// Partitions a binary image: mixed regions are split until the
	/// minimum block size, where the majority color wins.
	///
	/// Ties and regions wholly outside the image are black.
	pub fn build_mono(img: &MonoImage, region: Region, min_block_size: u32) -> Self {
		let (x_end, y_end) = region.clip(img.width(), img.height());
		let mut total = 0usize;
		let mut white = 0usize;
		for y in region.y..y_end {
			for x in region.x..x_end {
				total += 1;
				white += img.get(x, y) as usize;
			}
		}
		let mixed = white > 0 && white < total;
		if mixed && can_split(region.size, min_block_size) {
			let [nw, ne, sw, se] = region.quadrants();
			let sub = |r| Self::build_mono(img, r, min_block_size);
			Self::branch(region, [sub(nw), sub(ne), sub(sw), sub(se)])
		} else if white * 2 > total {
			Self::leaf(region, Mono::White)
		} else {
			Self::leaf(region, Mono::Black)
		}
	}
}

pub mod qtc;
pub mod raster;

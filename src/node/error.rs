use thiserror::Error;

/// Reason why an image couldn't be turned into a quadtree.
#[derive(Debug, Error, PartialEq)]
pub enum AnalyzeError {
	/// The image has a zero width or height.
	#[error("image has no pixels ({width}x{height})")]
	EmptyImage { width: u32, height: u32 },
	/// A raw buffer's length doesn't match `width * height * 3`.
	#[error("raw buffer holds {actual} bytes, expected {expected}")]
	BufferSize { expected: usize, actual: usize },
	/// Blocks can't be smaller than one pixel.
	#[error("minimum block size must be at least 1")]
	ZeroMinBlockSize,
	/// The error threshold is negative or not a number.
	#[error("invalid error threshold {0}")]
	InvalidThreshold(f64),
}

/// Reason why a quadtree encoding couldn't be decoded.
///
/// Every variant means the stream is corrupt; a decoder never
/// returns a partially built tree.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
	/// A node marker or color byte was expected but not found.
	#[error("stream ended at byte {offset} while a node was still expected")]
	InsufficientData { offset: usize },
	/// A byte in marker position is not a known node marker.
	#[error("unknown node marker {marker:#04x} at byte {offset}")]
	InvalidMarker { marker: u8, offset: usize },
	/// The tree ended before the stream did.
	#[error("{count} unexpected bytes after the tree at byte {offset}")]
	TrailingData { offset: usize, count: usize },
	/// There was no valid QTC file header.
	#[error("missing QTC header")]
	MissingHeader,
	/// The QTC header names a format version this crate can't read.
	#[error("unsupported QTC version {0}")]
	UnsupportedVersion(u8),
	/// The QTC file stores a different color variant than requested.
	#[error("QTC file stores color variant {found}, expected {expected}")]
	VariantMismatch { expected: u8, found: u8 },
	/// A tree was given dimensions it can't cover: zero, or too large for
	/// a power-of-two working square.
	#[error("invalid image dimensions {width}x{height}")]
	InvalidDimensions { width: u32, height: u32 },
}

/// Reason why an adaptive threshold search couldn't be started.
#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
	/// The target compression ratio lies outside `(0, 1)`.
	#[error("target ratio {0} must lie strictly between 0 and 1")]
	InvalidTarget(f64),
	/// The threshold bounds are empty, negative, or not numbers.
	#[error("invalid threshold bounds [{min}, {max}]")]
	InvalidBounds { min: f64, max: f64 },
	/// The iteration cap is zero, so no tree would ever be built.
	#[error("search needs at least one iteration")]
	NoIterations,
	#[error(transparent)]
	Analyze(#[from] AnalyzeError),
}

/// Non-fatal outcome of an adaptive threshold search.
///
/// The search still hands back its last tree; this only tells the caller
/// that the requested ratio wasn't met.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchWarning {
	#[error("target ratio not reached after {iterations} iterations \
		(threshold {threshold:.4}, achieved ratio {achieved_ratio:.4})")]
	ConvergenceNotReached {
		threshold: f64,
		achieved_ratio: f64,
		iterations: usize,
	},
}

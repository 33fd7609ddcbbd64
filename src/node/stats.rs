use super::color::Color;
use super::Region;

/// Per-channel aggregates over the in-bounds pixels of a region.
///
/// All fields come from one two-pass scan of the same pixel set: the first
/// pass gathers sums, extremes and histograms, the second measures
/// deviation from the first pass's mean. A region with no in-bounds pixels
/// has every statistic at zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockStatistics {
	/// Number of in-bounds pixels the statistics were taken over.
	pub count: u64,
	pub mean: [f64; 3],
	pub variance: [f64; 3],
	/// Mean absolute deviation from `mean`.
	pub mad: [f64; 3],
	/// `max - min` of each channel.
	pub range: [f64; 3],
	/// Shannon entropy (bits) of each channel's 256-bin histogram.
	pub entropy: [f64; 3],
	sums: [u64; 3],
}

impl BlockStatistics {
	pub fn compute(img: &image::RgbImage, region: Region) -> Self {
		let (x_end, y_end) = region.clip(img.width(), img.height());
		let mut sums = [0u64; 3];
		let mut min = [u8::MAX; 3];
		let mut max = [u8::MIN; 3];
		let mut hist = [[0u32; 256]; 3];
		let mut count = 0u64;
		for y in region.y..y_end {
			for x in region.x..x_end {
				let pix = img.get_pixel(x, y);
				for ch in 0..3 {
					let v = pix.0[ch];
					sums[ch] += v as u64;
					min[ch] = min[ch].min(v);
					max[ch] = max[ch].max(v);
					hist[ch][v as usize] += 1;
				}
				count += 1;
			}
		}
		if count == 0 {
			return Default::default();
		}

		let total = count as f64;
		let mut ret = BlockStatistics { count, sums, ..Default::default() };
		for ch in 0..3 {
			ret.mean[ch] = sums[ch] as f64 / total;
			ret.range[ch] = (max[ch] - min[ch]) as f64;
			ret.entropy[ch] = hist[ch].iter()
				.filter(|&&n| n > 0)
				.map(|&n| {
					let p = n as f64 / total;
					-p * p.log2()
				})
				.sum();
		}

		// Second pass
		let mut sq_dev = [0f64; 3];
		let mut abs_dev = [0f64; 3];
		for y in region.y..y_end {
			for x in region.x..x_end {
				let pix = img.get_pixel(x, y);
				for ch in 0..3 {
					let d = pix.0[ch] as f64 - ret.mean[ch];
					sq_dev[ch] += d * d;
					abs_dev[ch] += d.abs();
				}
			}
		}
		for ch in 0..3 {
			ret.variance[ch] = sq_dev[ch] / total;
			ret.mad[ch] = abs_dev[ch] / total;
		}
		ret
	}

	/// Mean color of the region, each channel sum integer-divided by the
	/// pixel count. Black for an empty region.
	pub fn average_color(&self) -> Color {
		if self.count == 0 {
			return image::Rgb([0; 3]);
		}
		image::Rgb([
			(self.sums[0] / self.count) as u8,
			(self.sums[1] / self.count) as u8,
			(self.sums[2] / self.count) as u8,
		])
	}

	/// Reduces the statistic picked by `method` to one scalar by averaging
	/// the three channels.
	pub fn error(&self, method: ErrorMethod) -> f64 {
		let per_channel = match method {
			ErrorMethod::Variance => &self.variance,
			ErrorMethod::MeanAbsoluteDeviation => &self.mad,
			ErrorMethod::MaxRange => &self.range,
			ErrorMethod::Entropy => &self.entropy,
		};
		per_channel.iter().sum::<f64>() / 3.
	}
}

/// Statistic used to decide whether a block gets subdivided.
///
/// Numbered 1 through 4 on the command line; see `from_code`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMethod {
	Variance,
	MeanAbsoluteDeviation,
	MaxRange,
	Entropy,
}

impl Default for ErrorMethod {
	fn default() -> Self {
		ErrorMethod::Variance
	}
}

impl ErrorMethod {
	/// 1 = variance, 2 = MAD, 3 = max channel range, 4 = entropy.
	///
	/// Any other number falls back to variance rather than failing.
	pub fn from_code(code: i64) -> Self {
		match code {
			1 => ErrorMethod::Variance,
			2 => ErrorMethod::MeanAbsoluteDeviation,
			3 => ErrorMethod::MaxRange,
			4 => ErrorMethod::Entropy,
			_ => {
				log::debug!("unknown error method {}, using variance", code);
				ErrorMethod::Variance
			}
		}
	}

	/// Inverse of `from_code` for the four known methods.
	pub fn code(self) -> i64 {
		match self {
			ErrorMethod::Variance => 1,
			ErrorMethod::MeanAbsoluteDeviation => 2,
			ErrorMethod::MaxRange => 3,
			ErrorMethod::Entropy => 4,
		}
	}
}

/// Error of `region` under `method`.
pub fn block_error(img: &image::RgbImage, region: Region, method: ErrorMethod) -> f64 {
	BlockStatistics::compute(img, region).error(method)
}

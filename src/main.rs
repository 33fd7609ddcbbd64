use image::error::ImageError;

use quadtree_compress::color::{Color, Mono, MonoImage, NodeColor};
use quadtree_compress::error::{DecodeError, SearchError};
use quadtree_compress::qtc::qtc_variant;
use quadtree_compress::stats::ErrorMethod;
use quadtree_compress::{CompressionConfig, Quadtree};

use std::fs::File;

use std::io::{Read, Write};

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	log::error!("{}", msg);
	std::process::exit(code)
}

fn image_error_exit(e: ImageError, reading: bool) -> ! {
	let (msg, code) = match e {
		ImageError::Decoding(_) => ("Invalid image data", 4),
		ImageError::Limits(_) => ("Computation limits exceeded", 5),
		ImageError::Unsupported(_) if !reading => ("Unsupported output format", 2),
		ImageError::IoError(_) if reading => ("File not found or could not be read", 3),
		ImageError::IoError(_) => ("Could not save output", 3),
		_ => ("An error occurred", 10)
	};
	error_exit(msg, code)
}

/// Parses an optional numeric argument, exiting on garbage.
fn numeric_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, default: &str) -> T {
	match matches.value_of(name).unwrap_or(default).parse() {
		Ok(n) => n,
		Err(_) => error_exit(&format!("Non-numeric value for {}", name), 2)
	}
}

/// Replaces the extension of `input` (if any) with `suffix`.
fn default_output(input: &str, suffix: &str) -> String {
	match input.rsplitn(2, '.').nth(1) {
		Some(stem) => stem.to_string() + suffix,
		None => input.to_string() + suffix
	}
}

fn report<C: NodeColor>(tree: &Quadtree<C>) {
	log::info!(
		"{} nodes ({} leaves), depth {}, {} bytes encoded from {} raw, ratio {:.4}",
		tree.node_count(),
		tree.leaf_count(),
		tree.depth(),
		tree.encoded_len(),
		tree.raw_len(),
		tree.compression_ratio()
	);
}

fn write_file(path: &str, data: &[u8]) {
	let mut out_fh = match File::create(path) {
		Ok(f) => f,
		Err(_) => error_exit("Could not open output file", 3)
	};
	if out_fh.write_all(data).is_err() {
		error_exit("Could not write to output file", 3)
	}
}

/// Compresses an image file; writes the reconstruction and optionally the
/// QTC tree.
fn compress_file(clap_matches: &clap::ArgMatches, input_path: &str) {
	let source = match image::open(input_path) {
		Ok(i) => i,
		Err(e) => image_error_exit(e, true)
	}.into_rgb8();
	let min_block_size = numeric_arg(clap_matches, "block", "1");

	let (reconstruction, qtc_data) = if clap_matches.is_present("mono") {
		if clap_matches.is_present("ratio") {
			log::warn!("--ratio has no effect with --mono");
		}
		let bitmap = MonoImage::from_rgb(&source, numeric_arg(clap_matches, "cutoff", "128"));
		let tree = match Quadtree::<Mono>::from_bitmap(&bitmap, min_block_size) {
			Ok(t) => t,
			Err(e) => error_exit(&e.to_string(), 2)
		};
		report(&tree);
		(tree.to_image(), tree.to_qtc())
	} else {
		let config = CompressionConfig {
			// Out-of-range codes, negative ones included, fall back to variance.
			method: ErrorMethod::from_code(numeric_arg::<i64>(clap_matches, "method", "1")),
			threshold: numeric_arg(clap_matches, "threshold", "10"),
			min_block_size,
			parallel: clap_matches.is_present("parallel"),
			..Default::default()
		}.with_target_ratio(numeric_arg(clap_matches, "ratio", "0"));
		let outcome = match config.compress(&source) {
			Ok(o) => o,
			Err(e @ SearchError::Analyze(_)) => error_exit(&e.to_string(), 4),
			Err(e) => error_exit(&e.to_string(), 2)
		};
		log::info!("error method {} ({:?})", config.method.code(), config.method);
		if config.target_ratio.is_some() {
			log::info!("threshold {:.4} after {} iteration(s)", outcome.threshold, outcome.iterations);
		}
		// Not reaching the target still leaves a perfectly good tree.
		if let Some(w) = &outcome.warning {
			log::warn!("{}", w);
		}
		report(&outcome.tree);
		(outcome.tree.to_image(), outcome.tree.to_qtc())
	};

	if let Some(tree_path) = clap_matches.value_of("tree") {
		write_file(tree_path, &qtc_data);
	}
	let output_path = clap_matches.value_of("OUTPUT")
		.map(str::to_string)
		.unwrap_or_else(|| default_output(input_path, "_quadtree.png"));
	if let Err(e) = reconstruction.save(&output_path) {
		image_error_exit(e, false)
	}
}

/// Decodes a QTC file into an image.
fn decompress_file(clap_matches: &clap::ArgMatches, input_path: &str) {
	let mut source_data = Vec::new();
	let mut source_fh = match File::open(input_path) {
		Ok(f) => f,
		Err(_) => error_exit("File not found or could not be read", 3)
	};
	if source_fh.read_to_end(&mut source_data).is_err() {
		error_exit("Could not read from input file", 3)
	}
	let decoded = match qtc_variant(&source_data) {
		Ok(v) if v == Color::VARIANT => Quadtree::<Color>::from_qtc(&source_data).map(|t| {
			report(&t);
			t.to_image()
		}),
		Ok(v) if v == Mono::VARIANT => Quadtree::<Mono>::from_qtc(&source_data).map(|t| {
			report(&t);
			t.to_image()
		}),
		Ok(v) => Err(DecodeError::VariantMismatch { expected: Color::VARIANT, found: v }),
		Err(e) => Err(e)
	};
	let output = match decoded {
		Ok(img) => img,
		Err(e) => error_exit(&format!("Invalid QTC data: {}", e), 4)
	};
	let output_path = clap_matches.value_of("OUTPUT")
		.map(str::to_string)
		.unwrap_or_else(|| default_output(input_path, ".png"));
	if let Err(e) = output.save(&output_path) {
		image_error_exit(e, false)
	}
}

/// `clap`-based CLI for compressing images with quadtrees.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image or QTC data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let clap_matches = clap::App::new("quadtree_compress")
		.version("0.1.0")
		.author("vkcz")
		.about("Lossy quadtree image compression, to and from QTC tree files.")
		.arg_from_usage("-i, --into 'Compress the input image; write the reconstruction to OUTPUT'")
		.arg_from_usage("-f, --from 'Convert the input file from QTC to an image'")
		.arg_from_usage("-m, --method=[N] 'Error method: 1 variance, 2 MAD, 3 max range, 4 entropy (--into only); defaults to 1'")
		.arg_from_usage("-t, --threshold=[N] 'Error threshold above which blocks are split (--into only); defaults to 10'")
		.arg_from_usage("-b, --block=[N] 'Minimum block size (--into only); defaults to 1'")
		.arg_from_usage("-r, --ratio=[N] 'Target compression ratio between 0 and 1, 0 to disable (--into only); defaults to 0'")
		.arg_from_usage("-q, --tree=[FILE] 'Also write the QTC tree to FILE (--into only)'")
		.arg_from_usage("-k, --mono 'Compress as a black and white image (--into only)'")
		.arg_from_usage("-c, --cutoff=[N] 'Luminance at or above which pixels are white (--mono only); defaults to 128'")
		.arg_from_usage("-p, --parallel 'Build quadrants in parallel when no target ratio is set (--into only)'")
		.arg_from_usage("<INPUT> 'Path to input file'")
		.arg_from_usage("[OUTPUT] 'Path to output image; defaults to INPUT with a modified file extension'")
		.get_matches();

	let (into_mode, from_mode) = (clap_matches.is_present("into"), clap_matches.is_present("from"));
	// INPUT is required, so `clap` has already exited if it's missing.
	let input_path = clap_matches.value_of("INPUT").unwrap_or_default();
	match (into_mode, from_mode) {
		(true, true) => error_exit("Only one of -i/--into and -f/--from must be present", 2),
		(true, false) => compress_file(&clap_matches, input_path),
		(false, true) => decompress_file(&clap_matches, input_path),
		(false, false) => error_exit("One of -i/--into and -f/--from must be present", 2)
	}
}

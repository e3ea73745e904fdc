//! interlock: generate jigsaw puzzles from image files.
//!
//! Reads an image, cuts it into interlocking pieces and writes the
//! puzzle configuration as JSON. Optionally writes an SVG of the cut
//! lines, per-piece masked PNGs and mask SVGs, and a summary of the
//! puzzle.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin interlock -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Log verbosity is controlled with `RUST_LOG` (default `info`); logs go
//! to stderr so stdout stays clean for JSON.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use interlock_engine::generator::DEFAULT_EXPANSION_RATIO;
use interlock_engine::{
    GenerateRequest, GeneratorOptions, GridSize, ImageSource, PuzzleConfig, ResampleFilter, generate,
    get_puzzle_stats, restore_bitmaps, strip_bitmaps,
};
use interlock_export::{SvgMetadata, render_masked_piece, to_board_svg, to_piece_mask_svg};
use tracing_subscriber::EnvFilter;

/// Cut an image into an irregular jigsaw puzzle.
///
/// Prints the puzzle configuration as JSON to stdout unless `--output`
/// is given.
#[derive(Parser)]
#[command(name = "interlock", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Grid rows (2-8).
    #[arg(long, default_value_t = 4)]
    rows: u32,

    /// Grid columns (2-8).
    #[arg(long, default_value_t = 4)]
    cols: u32,

    /// Puzzle name. Defaults to the image file stem.
    #[arg(long)]
    name: Option<String>,

    /// Share of a piece's side its bitmap extends into each neighbour (0.2-0.8).
    #[arg(long, default_value_t = DEFAULT_EXPANSION_RATIO)]
    expansion_ratio: f64,

    /// Edge seed. Derived from the image and grid when omitted.
    #[arg(long)]
    seed: Option<u32>,

    /// Side length of the square board in pixels.
    #[arg(long, default_value_t = GeneratorOptions::DEFAULT_TARGET_SIZE)]
    target_size: f64,

    /// Base tab intensity (0.3-0.7).
    #[arg(long, default_value_t = GeneratorOptions::DEFAULT_BASE_INTENSITY)]
    base_intensity: f64,

    /// Per-axis snap tolerance in pixels.
    #[arg(long, default_value_t = GeneratorOptions::DEFAULT_SNAP_TOLERANCE)]
    snap_tolerance: f64,

    /// Worker threads for slicing. Defaults to one per core.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    threads: Option<usize>,

    /// Resampling filter used to fit the image onto the board.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Full generator options as a JSON string.
    ///
    /// When provided, the individual option flags above (seed, target
    /// size, intensity, tolerance, threads, filter) are ignored. The JSON
    /// must be a valid `GeneratorOptions` serialization.
    #[arg(long)]
    options_json: Option<String>,

    /// Reload a puzzle saved with `--strip` and rebuild its bitmaps from
    /// the image instead of generating a new one. The filter and matte
    /// recorded in the saved puzzle are used; `--filter` is ignored.
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Write the puzzle configuration JSON to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Drop piece bitmaps from the written configuration.
    #[arg(long)]
    strip: bool,

    /// Write an SVG of the board's cut lines to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write `piece-<id>.png` (silhouette baked into alpha) and
    /// `piece-<id>.svg` (mask) for every piece into this directory.
    #[arg(long)]
    pieces_dir: Option<PathBuf>,

    /// Print a puzzle summary to stderr.
    #[arg(long)]
    stats: bool,

    /// Print the summary as JSON instead of a human-readable report.
    #[arg(long, requires = "stats")]
    json: bool,
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for ResampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

const fn filter_from_engine(f: ResampleFilter) -> Filter {
    match f {
        ResampleFilter::Nearest => Filter::Nearest,
        ResampleFilter::Triangle => Filter::Triangle,
        ResampleFilter::CatmullRom => Filter::CatmullRom,
        ResampleFilter::Gaussian => Filter::Gaussian,
        ResampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// Follows [`GeneratorOptions::DEFAULT_RESAMPLE_FILTER`].
const CLI_DEFAULT_FILTER: Filter = filter_from_engine(GeneratorOptions::DEFAULT_RESAMPLE_FILTER);

fn options_from_cli(cli: &Cli) -> Result<GeneratorOptions, String> {
    if let Some(ref json) = cli.options_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --options-json: {e}"));
    }

    Ok(GeneratorOptions {
        seed: cli.seed,
        target_size: cli.target_size,
        base_intensity: cli.base_intensity,
        snap_tolerance: cli.snap_tolerance,
        resample_filter: cli.filter.into(),
        threads: cli.threads,
        ..GeneratorOptions::default()
    })
}

fn puzzle_name(cli: &Cli) -> String {
    cli.name.clone().unwrap_or_else(|| {
        cli.image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("puzzle")
            .to_string()
    })
}

fn load_stripped(path: &Path, image_bytes: &[u8], options: &GeneratorOptions) -> Result<PuzzleConfig, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let mut config: PuzzleConfig =
        serde_json::from_str(&json).map_err(|e| format!("Error parsing {}: {e}", path.display()))?;
    restore_bitmaps(&mut config, image_bytes, options).map_err(|e| format!("Error restoring bitmaps: {e}"))?;
    Ok(config)
}

fn write_pieces(config: &PuzzleConfig, dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Error creating {}: {e}", dir.display()))?;

    for piece in &config.pieces {
        let png_path = dir.join(format!("piece-{}.png", piece.id));
        let masked = render_masked_piece(piece).map_err(|e| format!("Error masking piece {}: {e}", piece.id))?;
        masked
            .save(&png_path)
            .map_err(|e| format!("Error writing {}: {e}", png_path.display()))?;

        let svg_path = dir.join(format!("piece-{}.svg", piece.id));
        let svg = to_piece_mask_svg(piece).map_err(|e| format!("Error building mask {}: {e}", piece.id))?;
        std::fs::write(&svg_path, svg).map_err(|e| format!("Error writing {}: {e}", svg_path.display()))?;
    }

    tracing::info!(pieces = config.pieces.len(), dir = %dir.display(), "wrote piece files");
    Ok(())
}

fn print_stats(config: &PuzzleConfig, json: bool) -> Result<(), String> {
    let stats = get_puzzle_stats(config);
    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(|e| format!("Error serializing stats: {e}"))?;
        eprintln!("{text}");
        return Ok(());
    }

    eprintln!("Puzzle: {} ({})", config.name, config.id);
    eprintln!("Grid: {} ({} pieces, {})", config.grid_size, stats.total_pieces, stats.difficulty);
    eprintln!("Seed: {}", config.seed);
    eprintln!(
        "Edges: {} flat, {} knob, {} hole",
        stats.edge_types.flat, stats.edge_types.knob, stats.edge_types.hole,
    );
    eprintln!("Estimated time: {}", stats.estimated_time);
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = options_from_cli(cli)?;

    let image_bytes =
        std::fs::read(&cli.image_path).map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;
    tracing::debug!(path = %cli.image_path.display(), bytes = image_bytes.len(), "read image");

    let mut config = if let Some(ref saved) = cli.restore {
        load_stripped(saved, &image_bytes, &options)?
    } else {
        let request = GenerateRequest {
            image: ImageSource::Encoded {
                reference: cli.image_path.display().to_string(),
                bytes: image_bytes,
            },
            name: puzzle_name(cli),
            grid_size: GridSize::new(cli.rows, cli.cols),
            expansion_ratio: Some(cli.expansion_ratio),
            options,
        };
        generate(&request).map_err(|e| format!("Generation error: {e}"))?
    };

    if let Some(ref svg_path) = cli.svg {
        let description = format!("{} grid, seed {}", config.grid_size, config.seed);
        let layout_json = serde_json::to_string(&config.layout).map_err(|e| format!("Error serializing layout: {e}"))?;
        let metadata = SvgMetadata {
            title: Some(&config.name),
            description: Some(&description),
            config_json: Some(&layout_json),
        };
        let svg = to_board_svg(&config, &metadata);
        std::fs::write(svg_path, &svg).map_err(|e| format!("Error writing SVG to {}: {e}", svg_path.display()))?;
        tracing::info!(path = %svg_path.display(), bytes = svg.len(), "wrote board svg");
    }

    if let Some(ref dir) = cli.pieces_dir {
        write_pieces(&config, dir)?;
    }

    if cli.stats {
        print_stats(&config, cli.json)?;
    }

    if cli.strip {
        strip_bitmaps(&mut config);
    }
    let json = serde_json::to_string_pretty(&config).map_err(|e| format!("Error serializing puzzle: {e}"))?;
    match cli.output {
        Some(ref path) => {
            std::fs::write(path, &json).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = json.len(), "wrote puzzle config");
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Retouch CLI — headless batch retouching via command-line arguments
// ============================================================================
//
// Usage examples:
//   retouch -i photo.png --exposure 20 --contrast 10 -o graded.png
//   retouch -i photo.jpg --crop 100,50,800,600 --format jpg -q 85
//   retouch -i "shots/*.png" --blur 12 --output-dir blurred/
//   retouch -i logo.png --erase 40,40 --erase 44,40 --erase-radius 6 -o cut.png
//
// Each file runs through one engine: load → crop → erase stroke →
// grade/blur/sharpen → export. Settings from the config file provide the
// defaults for anything not given on the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::engine::{ImageEngine, LoadOutcome};
use crate::io::ExportFormat;
use crate::ops::adjustments::FilterParams;
use crate::settings::EngineSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Retouch headless image processor.
#[derive(Parser, Debug)]
#[command(
    name = "retouch",
    about = "Retouch headless batch image processor",
    long_about = "Grade, crop, erase, blur or sharpen image files and convert between\n\
                  formats. Reads PNG, JPEG, WEBP, BMP, TGA, ICO, TIFF and GIF (first\n\
                  frame); writes PNG, JPEG, BMP and TGA.\n\n\
                  Example:\n  \
                  retouch -i photo.png --exposure 20 -o graded.png\n  \
                  retouch -i *.jpg --sharpen 15 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga (or a MIME type such as image/png).
    /// When omitted, inferred from --output's extension, then from settings.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Defaults to the configured export quality.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Exposure offset (-100..100).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub exposure: Option<f32>,

    /// Contrast (-100..100).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub contrast: Option<f32>,

    /// Saturation (-100..100).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub saturation: Option<f32>,

    /// Temperature shift, warm positive (-100..100).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub temperature: Option<f32>,

    /// Tint shift, green positive (-100..100).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub tint: Option<f32>,

    /// Highlights lift (0..100; negative has no effect).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub highlights: Option<f32>,

    /// Shadows darken (0..100; negative has no effect).
    #[arg(long, allow_hyphen_values = true, value_name = "N")]
    pub shadows: Option<f32>,

    /// Gaussian blur radius (0..50). Replaces grading.
    #[arg(
        long,
        value_name = "RADIUS",
        conflicts_with_all = ["sharpen", "exposure", "contrast", "saturation", "temperature", "tint", "highlights", "shadows"]
    )]
    pub blur: Option<f32>,

    /// Unsharp-mask amount (0..50). Replaces grading.
    #[arg(
        long,
        value_name = "AMOUNT",
        conflicts_with_all = ["exposure", "contrast", "saturation", "temperature", "tint", "highlights", "shadows"]
    )]
    pub sharpen: Option<f32>,

    /// Crop rectangle as x,y,width,height. Clamped to the image.
    #[arg(long, value_name = "X,Y,W,H", allow_hyphen_values = true, value_parser = parse_crop)]
    pub crop: Option<CropArg>,

    /// Erase a circle centred at x,y (after cropping). Repeat for a stroke.
    #[arg(long, value_name = "X,Y", allow_hyphen_values = true, value_parser = parse_point)]
    pub erase: Vec<(f32, f32)>,

    /// Eraser radius in pixels. Defaults to the configured radius.
    #[arg(long, value_name = "PX")]
    pub erase_radius: Option<f32>,

    /// Print per-file timing and history information.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropArg {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

fn parse_crop(s: &str) -> Result<CropArg, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected x,y,width,height, got '{}'", s));
    };
    let num = |v: &str| v.parse::<i64>().map_err(|e| format!("'{}': {}", v, e));
    Ok(CropArg { x: num(*x)?, y: num(*y)?, width: num(*w)?, height: num(*h)? })
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let Some((x, y)) = s.split_once(',') else {
        return Err(format!("expected x,y, got '{}'", s));
    };
    let num = |v: &str| v.trim().parse::<f32>().map_err(|e| format!("'{}': {}", v, e));
    Ok((num(x)?, num(y)?))
}

impl CliArgs {
    /// The grading flags, or `None` when none were given.
    fn filter_params(&self) -> Option<FilterParams> {
        let any = [
            self.exposure,
            self.contrast,
            self.saturation,
            self.temperature,
            self.tint,
            self.highlights,
            self.shadows,
        ]
        .iter()
        .any(Option::is_some);
        if !any {
            return None;
        }
        Some(FilterParams {
            exposure: self.exposure.unwrap_or(0.0),
            contrast: self.contrast.unwrap_or(0.0),
            saturation: self.saturation.unwrap_or(0.0),
            temperature: self.temperature.unwrap_or(0.0),
            tint: self.tint.unwrap_or(0.0),
            highlights: self.highlights.unwrap_or(0.0),
            shadows: self.shadows.unwrap_or(0.0),
        })
    }
}

/// Everything `run_one` needs that is shared across files.
struct Job {
    settings: EngineSettings,
    format: ExportFormat,
    quality: u8,
    crop: Option<CropArg>,
    erase: Vec<(f32, f32)>,
    grade: Option<FilterParams>,
    blur: Option<f32>,
    sharpen: Option<f32>,
    verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let mut settings = EngineSettings::load();
    if let Some(r) = args.erase_radius {
        settings.erase_radius = r;
    }

    let target = OutputTarget::from_args(args.output.as_deref(), args.output_dir.as_deref());
    let format = match target.format(args.format.as_deref(), settings.export_format) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let job = Job {
        quality: args.quality.unwrap_or(settings.export_quality),
        grade: args.filter_params(),
        settings,
        format,
        crop: args.crop,
        erase: args.erase.clone(),
        blur: args.blur,
        sharpen: args.sharpen,
        verbose: args.verbose,
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = target.path_for(input_path, format) else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &job) {
            Ok(()) => {
                log_info!("{} -> {}", input_path.display(), output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, job: &Job) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let bytes = std::fs::read(input).map_err(|e| format!("read failed: {}", e))?;
    let mut engine = ImageEngine::new(job.settings.clone());
    match pollster::block_on(engine.load(bytes)) {
        Ok(LoadOutcome::Applied) => {}
        Ok(LoadOutcome::Superseded) => return Err("load was superseded".to_string()),
        Err(e) => return Err(format!("load failed: {}", e)),
    }

    // -- Step 2: Destructive edits ---------------------------------------
    if let Some(c) = job.crop
        && !engine.apply_crop(c.x, c.y, c.width, c.height)
    {
        log_warn!("{}: crop {},{},{},{} is empty after clamping", input.display(), c.x, c.y, c.width, c.height);
        eprintln!("  warning: crop {},{},{},{} is empty after clamping; skipped", c.x, c.y, c.width, c.height);
    }

    if !job.erase.is_empty() {
        engine.start_erasing();
        for &(x, y) in &job.erase {
            engine.erase(x, y);
        }
        engine.stop_erasing();
    }

    // -- Step 3: Live adjustment -----------------------------------------
    if let Some(radius) = job.blur {
        engine.apply_blur(radius);
    } else if let Some(amount) = job.sharpen {
        engine.apply_sharpness(amount);
    } else if let Some(params) = job.grade {
        engine.apply_filters(params);
    }

    if job.verbose {
        println!("  history: {}", engine.history().descriptions().join(" → "));
    }

    // -- Step 4: Export --------------------------------------------------
    let encoded = pollster::block_on(engine.export(job.format, job.quality))
        .map_err(|e| format!("export failed: {}", e))?;
    std::fs::write(output, encoded).map_err(|e| format!("write failed: {}", e))?;

    Ok(())
}

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Expand one `--input` value. An existing path is taken literally (so
/// names containing `[` or `*` still work); anything else is a glob.
fn expand_input(pattern: &str) -> Result<Vec<PathBuf>, String> {
    let literal = Path::new(pattern);
    if literal.exists() {
        return Ok(vec![literal.to_path_buf()]);
    }
    let paths = glob::glob(pattern).map_err(|e| format!("invalid glob '{}': {}", pattern, e))?;
    let matched: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
    if matched.is_empty() {
        return Err(format!("pattern '{}' matched no files", pattern));
    }
    Ok(matched)
}

/// All inputs in command-line order, first occurrence wins.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut inputs: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        match expand_input(pattern) {
            Ok(paths) => {
                for p in paths {
                    if !inputs.contains(&p) {
                        inputs.push(p);
                    }
                }
            }
            Err(e) => eprintln!("warning: {}.", e),
        }
    }
    inputs
}

/// Where results go, decided once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
enum OutputTarget {
    /// `--output`: one explicit file.
    File(PathBuf),
    /// `--output-dir`: `<dir>/<stem>.<ext>`.
    Dir(PathBuf),
    /// Neither: next to the input, suffixed `_out` if the name would clash.
    BesideInput,
}

impl OutputTarget {
    fn from_args(output: Option<&Path>, output_dir: Option<&Path>) -> Self {
        match (output_dir, output) {
            (Some(dir), _) => OutputTarget::Dir(dir.to_path_buf()),
            (None, Some(file)) => OutputTarget::File(file.to_path_buf()),
            (None, None) => OutputTarget::BesideInput,
        }
    }

    /// Format for this run: `--format` wins, then an explicit output file's
    /// extension, then `fallback`. An unknown `--format` is an error.
    fn format(&self, format_arg: Option<&str>, fallback: ExportFormat) -> Result<ExportFormat, String> {
        if let Some(f) = format_arg {
            return ExportFormat::parse(f).ok_or_else(|| format!("unsupported output format '{}'", f));
        }
        let from_ext = match self {
            OutputTarget::File(path) => path.extension().and_then(|e| e.to_str()).and_then(ExportFormat::parse),
            _ => None,
        };
        Ok(from_ext.unwrap_or(fallback))
    }

    fn path_for(&self, input: &Path, format: ExportFormat) -> Option<PathBuf> {
        let file_name = |suffix: &str| -> Option<String> {
            let stem = input.file_stem()?.to_string_lossy();
            Some(format!("{}{}.{}", stem, suffix, format.extension()))
        };
        match self {
            OutputTarget::File(path) => Some(path.clone()),
            OutputTarget::Dir(dir) => Some(dir.join(file_name("")?)),
            OutputTarget::BesideInput => {
                let parent = input.parent().unwrap_or(Path::new("."));
                let candidate = parent.join(file_name("")?);
                if candidate == input {
                    Some(parent.join(file_name("_out")?))
                } else {
                    Some(candidate)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_and_point_parsing() {
        assert_eq!(parse_crop("1, 2,30,-4"), Ok(CropArg { x: 1, y: 2, width: 30, height: -4 }));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,2,3,4").is_err());
        assert_eq!(parse_point("3.5,7"), Ok((3.5, 7.0)));
        assert!(parse_point("3.5").is_err());
    }

    #[test]
    fn format_priority() {
        let file = OutputTarget::File(PathBuf::from("shot.jpg"));
        assert_eq!(file.format(Some("bmp"), ExportFormat::Png), Ok(ExportFormat::Bmp));
        assert_eq!(file.format(None, ExportFormat::Png), Ok(ExportFormat::Jpeg));
        let gif = OutputTarget::File(PathBuf::from("x.gif"));
        assert_eq!(gif.format(None, ExportFormat::Tga), Ok(ExportFormat::Tga));
        let dir = OutputTarget::Dir(PathBuf::from("out.jpg"));
        assert_eq!(dir.format(None, ExportFormat::Png), Ok(ExportFormat::Png));
        assert!(OutputTarget::BesideInput.format(Some("webp"), ExportFormat::Png).is_err());
    }

    #[test]
    fn output_dir_takes_precedence_over_file() {
        let t = OutputTarget::from_args(Some(Path::new("a.png")), Some(Path::new("out")));
        assert_eq!(t, OutputTarget::Dir(PathBuf::from("out")));
        assert_eq!(OutputTarget::from_args(None, None), OutputTarget::BesideInput);
    }

    #[test]
    fn output_path_avoids_overwriting_input() {
        let beside = OutputTarget::BesideInput;
        assert_eq!(beside.path_for(Path::new("dir/a.png"), ExportFormat::Png).unwrap(), Path::new("dir/a_out.png"));
        assert_eq!(beside.path_for(Path::new("dir/a.png"), ExportFormat::Bmp).unwrap(), Path::new("dir/a.bmp"));
        let dir = OutputTarget::Dir(PathBuf::from("out"));
        assert_eq!(dir.path_for(Path::new("dir/a.png"), ExportFormat::Jpeg).unwrap(), Path::new("out/a.jpg"));
    }

    #[test]
    fn inputs_expand_and_dedupe() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "notes.txt"] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let a = tmp.path().join("a.png");
        let pattern = tmp.path().join("*.png").to_string_lossy().into_owned();
        let inputs = resolve_inputs(&[a.to_string_lossy().into_owned(), pattern.clone()]);
        assert_eq!(inputs, vec![a, tmp.path().join("b.png")]);

        let none = tmp.path().join("*.jpg").to_string_lossy().into_owned();
        assert!(expand_input(&none).is_err());
        assert!(resolve_inputs(&[none]).is_empty());
    }

    #[test]
    fn grading_flags_collect_into_params() {
        let args = CliArgs::try_parse_from(["retouch", "-i", "a.png", "--exposure", "-20", "--tint", "5"]).unwrap();
        let p = args.filter_params().unwrap();
        assert_eq!(p.exposure, -20.0);
        assert_eq!(p.tint, 5.0);
        assert_eq!(p.contrast, 0.0);
    }

    #[test]
    fn blur_conflicts_with_grading() {
        assert!(CliArgs::try_parse_from(["retouch", "-i", "a.png", "--blur", "4", "--exposure", "3"]).is_err());
        let args = CliArgs::try_parse_from(["retouch", "-i", "a.png", "--erase", "1,2", "--erase", "3,4"]).unwrap();
        assert_eq!(args.erase, vec![(1.0, 2.0), (3.0, 4.0)]);
        assert!(args.filter_params().is_none());
    }
}

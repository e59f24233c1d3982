use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use centerline_trace::kurbo::Rect;
use centerline_trace::{place, svg, trace, Autotrace, ClipRect, ImageSource, TraceConfig, TraceError};
use clap::{ArgAction, Parser};
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "centerline-trace",
    about = "Trace line-art images into single centerline paths (via autotrace)"
)]
struct Cli {
    /// Input images: paths, file:// URIs or data:image/...;base64 URIs
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output SVG file, or a directory when tracing several images (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON preset; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trace bright lines on a dark background
    #[arg(long)]
    invert: bool,

    /// Only trace inside X,Y,W,H (fractions of the image size)
    #[arg(long, value_parser = parse_clip, allow_hyphen_values = true)]
    clip: Option<ClipRect>,

    /// Fixed stroke width instead of the estimated one
    #[arg(long)]
    hairline: Option<f64>,

    /// Downscale larger images to this many megapixels
    #[arg(long)]
    megapixels: Option<f64>,

    /// Illumination equalization strength (0 = off)
    #[arg(long)]
    equal_light: Option<f64>,

    /// Number of thresholds to try (1-255)
    #[arg(long)]
    candidates: Option<u32>,

    /// Despeckle median filter size (0 = off)
    #[arg(long)]
    despeckle: Option<u32>,

    /// ROF denoise weight (0 = off)
    #[arg(long)]
    denoise: Option<f64>,

    /// autotrace --error-threshold
    #[arg(long)]
    error_threshold: Option<f64>,

    /// autotrace --filter-iterations
    #[arg(long)]
    filter_iterations: Option<u32>,

    /// autotrace program name or path
    #[arg(long)]
    autotrace: Option<String>,

    /// Per-threshold tracer timeout in seconds (0 = none)
    #[arg(long)]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug); RUST_LOG also works
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_clip(value: &str) -> Result<ClipRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts[..] {
        [x, y, w, h] => Ok(ClipRect::new(x, y, w, h)),
        _ => Err("expected X,Y,W,H".to_string()),
    }
}

fn build_config(cli: &Cli) -> Result<TraceConfig, TraceError> {
    let mut config = match &cli.config {
        Some(path) => TraceConfig::from_json_file(path)?,
        None => TraceConfig::default(),
    };
    config.invert |= cli.invert;
    config.clip |= cli.clip.is_some();
    if let Some(width) = cli.hairline {
        config.hairline = true;
        config.hairline_width = width;
    }
    if let Some(v) = cli.megapixels {
        config.megapixels = v;
    }
    if let Some(v) = cli.equal_light {
        config.equal_light = v;
    }
    if let Some(v) = cli.candidates {
        config.candidates = v;
    }
    if let Some(v) = cli.despeckle {
        config.median_size = v;
    }
    if let Some(v) = cli.denoise {
        config.denoise_weight = v;
    }
    if let Some(v) = cli.error_threshold {
        config.error_threshold = v;
    }
    if let Some(v) = cli.filter_iterations {
        config.filter_iterations = v;
    }
    if let Some(v) = &cli.autotrace {
        config.tracer_program = v.clone();
    }
    if let Some(v) = cli.timeout {
        config.tracer_timeout_secs = v;
    }
    config.validate()?;
    Ok(config)
}

/// Trace one input and return the SVG document, in the image's pixel space.
fn trace_one(
    input: &str,
    config: &TraceConfig,
    clip: Option<&ClipRect>,
    tracer: &Autotrace,
) -> Result<String, TraceError> {
    let image = ImageSource::from_href(input)?.load()?;
    let (w, h) = (image.width() as f64, image.height() as f64);
    eprintln!("  Load        {}x{} px", image.width(), image.height());

    let t_trace = Instant::now();
    let result = trace(&image, config, clip, tracer)?;
    eprintln!(
        "  Trace       {} candidates \u{00b7} {}ms",
        result.attempts,
        t_trace.elapsed().as_millis()
    );
    // Traced coordinates start at the crop's pixel corner.
    let clip_rect = match clip {
        Some(c) if config.clip => {
            let b = c.pixel_bounds(image.width(), image.height())?;
            Some(Rect::new(b.x0 as f64, b.y0 as f64, b.x1 as f64, b.y1 as f64))
        }
        _ => None,
    };
    let placed = place(&result, Rect::new(0.0, 0.0, w, h), clip_rect, config)?;
    eprintln!(
        "  Result      threshold {} ({}/{}) \u{00b7} {} segments \u{00b7} {} points \u{00b7} stroke {:.2}",
        result.threshold,
        result.index,
        result.attempts,
        result.stats.segments,
        result.stats.points,
        placed.stroke_width,
    );
    Ok(svg::document(&placed.d, placed.stroke_width, w, h))
}

/// Where the SVG for input `index` goes; `None` means stdout.
fn output_path(cli: &Cli, index: usize, input: &str) -> Option<PathBuf> {
    let out = cli.output.as_ref()?;
    if cli.inputs.len() == 1 {
        return Some(out.clone());
    }
    let stem = ImageSource::from_href(input)
        .ok()
        .and_then(|source| match source {
            ImageSource::File(path) => path.file_stem().map(|s| s.to_string_lossy().into_owned()),
            ImageSource::Embedded(_) => None,
        })
        .unwrap_or_else(|| format!("image-{}", index + 1));
    Some(out.join(format!("{}.svg", stem)))
}

fn write_svg(path: Option<&Path>, svg: &str) -> std::io::Result<()> {
    match path {
        Some(path) => std::fs::write(path, svg),
        None => {
            print!("{}", svg);
            Ok(())
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = build_config(&cli)?;
    let tracer = Autotrace::locate(&config)?;

    if cli.inputs.len() > 1 && cli.output.is_none() {
        return Err("several inputs need --output <DIR>".into());
    }
    if cli.inputs.len() > 1 {
        if let Some(dir) = &cli.output {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut failed = 0usize;
    for (index, input) in cli.inputs.iter().enumerate() {
        let shown: String = input.chars().take(60).collect();
        eprintln!();
        eprintln!("  centerline-trace \u{00b7} {}", shown);

        match trace_one(input, &config, cli.clip.as_ref(), &tracer) {
            Ok(svg) => {
                let path = output_path(&cli, index, input);
                write_svg(path.as_deref(), &svg)?;
                if let Some(path) = path {
                    eprintln!("  \u{2713} {}", path.display());
                }
            }
            // Without a tracer no other image can succeed either.
            Err(err @ TraceError::TracerUnavailable(_)) => return Err(err.into()),
            Err(err) => {
                eprintln!("  \u{2717} {}", err);
                failed += 1;
            }
        }
    }
    eprintln!();

    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_parses_four_fractions() {
        assert_eq!(parse_clip("0.1, 0.2,0.5,0.5").unwrap(), ClipRect::new(0.1, 0.2, 0.5, 0.5));
        assert_eq!(parse_clip("-0.5,-0.5,2,2").unwrap(), ClipRect::new(-0.5, -0.5, 2.0, 2.0));
        assert!(parse_clip("0.1,0.2").is_err());
        assert!(parse_clip("a,b,c,d").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "centerline-trace",
            "--invert",
            "--candidates",
            "31",
            "--hairline",
            "0.3",
            "--clip",
            "0,0,0.5,0.5",
            "in.png",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(config.invert);
        assert!(config.clip);
        assert!(config.hairline);
        assert_eq!(config.hairline_width, 0.3);
        assert_eq!(config.candidates, 31);
        assert_eq!(config.megapixels, TraceConfig::default().megapixels);
    }

    #[test]
    fn batch_outputs_are_named_after_inputs() {
        let cli = Cli::parse_from(["centerline-trace", "-o", "out", "a/sheep.png", "file:///b/cat.jpg"]);
        assert_eq!(output_path(&cli, 0, "a/sheep.png"), Some(PathBuf::from("out/sheep.svg")));
        assert_eq!(output_path(&cli, 1, "file:///b/cat.jpg"), Some(PathBuf::from("out/cat.svg")));
    }

    #[cfg(unix)]
    #[test]
    fn clipped_trace_lands_inside_the_clip() {
        use centerline_trace::kurbo::{BezPath, PathEl, Point};
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("autotrace");
        std::fs::write(&script, "#!/bin/sh\necho '<svg><path d=\"M1 1L3 1\"/></svg>'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let page = dir.path().join("page.png");
        image::GrayImage::from_pixel(100, 100, image::Luma([200])).save(&page).unwrap();

        let config = TraceConfig {
            clip: true,
            candidates: 3,
            tracer_program: script.to_string_lossy().into_owned(),
            ..TraceConfig::default()
        };
        let tracer = Autotrace::new(&config);
        let clip = ClipRect::new(0.5, 0.5, 0.5, 0.5);
        let svg = trace_one(&page.to_string_lossy(), &config, Some(&clip), &tracer).unwrap();

        let d = svg.split(" d=\"").nth(1).unwrap().split('"').next().unwrap();
        let path = BezPath::from_svg(d).unwrap();
        // Padded crop pixel (1, 1) is image pixel (50, 50).
        match path.elements()[..] {
            [PathEl::MoveTo(start), PathEl::LineTo(end)] => {
                assert_eq!(start, Point::new(50.0, 50.0));
                assert_eq!(end, Point::new(52.0, 50.0));
            }
            ref other => panic!("unexpected path {other:?}"),
        }
    }
}

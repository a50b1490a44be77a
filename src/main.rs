use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use dentiscan::config;
use dentiscan::overlay::{project_detections, RenderGeometry};
use dentiscan::{is_supported_radiograph, ServiceClient, WorkflowController};

#[derive(Parser)]
#[command(name = "dentiscan")]
#[command(about = "Analyze a dental DICOM radiograph: upload, detect pathologies, report")]
struct Cli {
    /// Path to the DICOM file (.dcm or .rvg)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Base URL of the analysis services (overrides DENTISCAN_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Stop after detection, skip report generation
    #[arg(long)]
    skip_report: bool,

    /// Display geometry WxH for printing projected overlay rectangles
    #[arg(long, value_name = "WxH")]
    viewport: Option<String>,

    /// Natural image size WxH (required with --viewport)
    #[arg(long, value_name = "WxH", requires = "viewport")]
    natural: Option<String>,
}

fn parse_size(spec: &str) -> anyhow::Result<(f32, f32)> {
    let (w, h) = spec
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WxH, got '{spec}'"))?;
    Ok((
        w.trim().parse().with_context(|| format!("bad width '{w}'"))?,
        h.trim().parse().with_context(|| format!("bad height '{h}'"))?,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if args.verbose {
                    "dentiscan=debug"
                } else {
                    "dentiscan=warn"
                })
            }),
        )
        .init();

    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no usable name")?
        .to_string();
    if !is_supported_radiograph(&file_name) {
        anyhow::bail!("File must be .dcm or .rvg: {file_name}");
    }

    let api_url = args.api_url.unwrap_or_else(config::api_url_from_env);
    if args.verbose {
        println!("Using analysis services at {api_url}");
    }
    let backend = ServiceClient::new(&api_url)?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {:?}", args.file))?;

    let mut ctrl = WorkflowController::new();
    ctrl.select_file(&file_name);

    // Each stage is advanced explicitly; nothing chains on its own.
    if args.verbose {
        println!("Uploading and converting {file_name}...");
    }
    ctrl.upload(&backend, bytes).await;
    if let Some(err) = ctrl.error() {
        anyhow::bail!("{err}");
    }
    println!("Uploaded: file id {}", ctrl.session().file_id);
    println!("Preview:  {}", ctrl.session().preview_url);

    if args.verbose {
        println!("\nAnalyzing X-ray for pathologies...");
    }
    ctrl.detect(&backend).await;
    if let Some(err) = ctrl.error() {
        anyhow::bail!("{err}");
    }

    let detections = &ctrl.session().detections;
    println!("\n{}", ctrl.notice().unwrap_or_default());
    for det in detections {
        println!(
            "  {} ({:.1}%) at ({:.0}, {:.0}) size {:.0}x{:.0}",
            det.label,
            det.confidence * 100.0,
            det.center_x,
            det.center_y,
            det.width,
            det.height,
        );
    }

    if let Some(viewport) = &args.viewport {
        let (display_width, display_height) = parse_size(viewport)?;
        let natural = args.natural.as_deref().context("--viewport needs --natural")?;
        let (natural_width, natural_height) = parse_size(natural)?;
        let geometry = RenderGeometry {
            natural_width,
            natural_height,
            display_width,
            display_height,
            offset_x: 0.0,
            offset_y: 0.0,
        };
        println!("\nProjected rectangles at {display_width}x{display_height}:");
        for (det, rect) in detections.iter().zip(project_detections(detections, &geometry)) {
            println!(
                "  {}: left {:.1}, top {:.1}, {:.1}x{:.1}",
                det.label, rect.left, rect.top, rect.width, rect.height
            );
        }
    }

    if args.skip_report || detections.is_empty() {
        return Ok(());
    }

    if args.verbose {
        println!("\nGenerating diagnostic report...");
    }
    ctrl.report(&backend).await;
    if let Some(err) = ctrl.error() {
        anyhow::bail!("{err}");
    }
    println!("\n=== Diagnostic Report ===");
    println!("{}", ctrl.session().report);

    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use grid_core::constants::{CELL_SUBGRID_DIVISIONS, CELL_VIEW_MAX_DIMENSION};
use grid_core::{
    CropRegion, GridCell, GridError, GridLayout, ProjectSnapshot, Rotation, cell_label,
    initial_crop,
};
use grid_render::{
    LabelFonts, OverlayOptions, append_footer, crop_raster, decode_data_url, encode_png,
    pixmap_from_rgba, png_data_url, print_document, render_cell, render_overlay,
};
use serde::Serialize;
use tiny_skia::Pixmap;

#[derive(Parser, Debug)]
#[command(
    name = "grid-print",
    version,
    about = "Render grid drawing projects without a browser"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the grid overlay of a project as PNG
    Overlay(OverlayArgs),
    /// Write one zoomed square of a project as PNG
    Cell(CellArgs),
    /// Write a self-printing HTML page for a project
    Html(OverlayArgs),
    /// Crop an image to the aspect ratio of a sheet of paper
    Crop(CropArgs),
    /// Print grid size and progress of a project as JSON
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct OverlayArgs {
    /// Project JSON file
    project: PathBuf,
    /// Output file
    output: PathBuf,
    /// Use the on-screen style (white lines, completed squares) instead of the print style
    #[arg(long)]
    screen: bool,
    /// Shade completed squares
    #[arg(long)]
    completed: bool,
    /// Leave out the A1, B2, ... square labels
    #[arg(long)]
    no_labels: bool,
    /// Grid line opacity, 0.1 to 0.8
    #[arg(long)]
    opacity: Option<f32>,
    /// Grid line thickness in pixels, 0.5 to 2
    #[arg(long)]
    thickness: Option<f32>,
    /// Skip the title/notes band
    #[arg(long)]
    no_footer: bool,
    /// Font file for labels (default: system sans-serif)
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CellArgs {
    project: PathBuf,
    output: PathBuf,
    /// Square as `row-col` (zero based), e.g. `2-5`
    #[arg(long)]
    cell: GridCell,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    #[arg(long, default_value_t = 0)]
    rotation: i32,
    /// Longest side of the output in pixels
    #[arg(long, default_value_t = CELL_VIEW_MAX_DIMENSION)]
    max: u32,
}

#[derive(Args, Debug)]
struct CropArgs {
    /// Source image (any format the `image` crate reads)
    input: PathBuf,
    output: PathBuf,
    #[arg(long, default_value_t = 18.0)]
    paper_width: f64,
    #[arg(long, default_value_t = 24.0)]
    paper_height: f64,
    /// Explicit region `x,y,width,height` instead of the centered default
    #[arg(long, value_parser = parse_region)]
    region: Option<CropRegion>,
    /// Display-to-image scale the region was measured at
    #[arg(long, default_value_t = 1.0)]
    display_scale: f64,
}

#[derive(Args, Debug)]
struct StatsArgs {
    project: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    title: String,
    columns: u32,
    rows: u32,
    total_squares: u64,
    completed_squares: usize,
    completed_labels: Vec<String>,
}

fn parse_region(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(CropRegion { x, y, width, height }),
        _ => Err("expected x,y,width,height".to_string()),
    }
}

fn load_project(path: &Path) -> Result<ProjectSnapshot, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(ProjectSnapshot::from_json(&text)?)
}

fn decode_image_bytes(bytes: &[u8]) -> Result<Pixmap, GridError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| GridError::ImageLoad(e.to_string()))?
        .to_rgba8();
    pixmap_from_rgba(img.width(), img.height(), img.as_raw())
}

fn drawing_image(project: &ProjectSnapshot) -> Result<Pixmap, GridError> {
    let url = project
        .cropped_image
        .as_deref()
        .ok_or_else(|| GridError::Validation("project file missing image data".to_string()))?;
    let (mime, bytes) = decode_data_url(url)?;
    eprintln!("decoding {mime} image ({} bytes)", bytes.len());
    decode_image_bytes(&bytes)
}

fn label_fonts(path: Option<&Path>) -> Result<LabelFonts, Box<dyn std::error::Error>> {
    let fonts = match path {
        Some(p) => LabelFonts::from_font_data(fs::read(p)?),
        None => LabelFonts::system(),
    };
    if fonts.is_empty() {
        eprintln!("warning: no fonts available; labels and footer text are skipped");
    }
    Ok(fonts)
}

fn overlay_options(args: &OverlayArgs) -> OverlayOptions {
    let mut opts = if args.screen {
        OverlayOptions::screen()
    } else {
        OverlayOptions::print()
    };
    if args.completed {
        opts.show_completed = true;
    }
    if args.no_labels {
        opts.show_labels = false;
    }
    if let Some(v) = args.opacity {
        opts = opts.with_line_opacity(v);
    }
    if let Some(v) = args.thickness {
        opts = opts.with_line_thickness(v);
    }
    opts
}

fn render_page(args: &OverlayArgs) -> Result<(ProjectSnapshot, Pixmap), Box<dyn std::error::Error>> {
    let project = load_project(&args.project)?;
    let config = project.settings.configuration()?;
    let image = drawing_image(&project)?;
    let fonts = label_fonts(args.font.as_deref())?;
    let overlay = render_overlay(
        &image,
        config.dims(),
        &project.completed_squares,
        &overlay_options(args),
        &fonts,
    )?;
    let page = if args.no_footer {
        overlay
    } else {
        append_footer(&overlay, &project.settings.footer_text(), &fonts)?
    };
    Ok((project, page))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Overlay(args) => {
            let (_, page) = render_page(&args)?;
            fs::write(&args.output, encode_png(&page)?)?;
            eprintln!("wrote {}x{} overlay to {}", page.width(), page.height(), args.output.display());
        }
        Commands::Html(args) => {
            let (project, page) = render_page(&args)?;
            let html = print_document(&project.settings.print_title(), &png_data_url(&page)?);
            fs::write(&args.output, html)?;
            eprintln!("wrote print page to {}", args.output.display());
        }
        Commands::Cell(args) => {
            let project = load_project(&args.project)?;
            let config = project.settings.configuration()?;
            let rotation = Rotation::from_degrees(args.rotation)
                .ok_or_else(|| format!("rotation must be a multiple of 90, got {}", args.rotation))?;
            let image = drawing_image(&project)?;
            let layout = GridLayout::new(image.width() as f64, image.height() as f64, config.dims());
            let rect = layout.cell_rect(args.cell).ok_or_else(|| {
                format!(
                    "square {} is outside the {}x{} grid",
                    args.cell,
                    config.dims().columns,
                    config.dims().rows
                )
            })?;
            let out = render_cell(Some(&image), &rect, rotation, args.max, CELL_SUBGRID_DIVISIONS)?;
            fs::write(&args.output, encode_png(&out)?)?;
            eprintln!(
                "wrote square {} ({}x{}) to {}",
                cell_label(args.cell),
                out.width(),
                out.height(),
                args.output.display()
            );
        }
        Commands::Crop(args) => {
            if !(args.paper_width > 0.0 && args.paper_height > 0.0) {
                return Err("paper dimensions must be positive".into());
            }
            let image = decode_image_bytes(&fs::read(&args.input)?)?;
            let region = match args.region {
                Some(r) => r.to_natural(args.display_scale, args.display_scale),
                None => initial_crop(
                    image.width() as f64,
                    image.height() as f64,
                    args.paper_width / args.paper_height,
                ),
            };
            let out = crop_raster(&image, &region)?;
            fs::write(&args.output, encode_png(&out)?)?;
            eprintln!(
                "cropped {:.0},{:.0} {:.0}x{:.0} to {}",
                region.x,
                region.y,
                region.width,
                region.height,
                args.output.display()
            );
        }
        Commands::Stats(args) => {
            let project = load_project(&args.project)?;
            let dims = project.settings.configuration()?.dims();
            let stats = Stats {
                title: project.settings.title.clone(),
                columns: dims.columns,
                rows: dims.rows,
                total_squares: dims.total(),
                completed_squares: project.completed_squares.count(),
                completed_labels: project
                    .completed_squares
                    .completed_cells(dims)
                    .into_iter()
                    .map(cell_label)
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

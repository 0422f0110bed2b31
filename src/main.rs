use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueHint};
use tomo_patch::{
    ExtractorConfig, Navigation, PickKind, Point, Result, Session, VolumeLoader,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Inspect tomographic stacks and export training patches"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log dimensions, value range and display scale of a stack
    Inspect(CommonArgs),

    /// Sample patches around a picked center and radius on every slice
    Export(ExportArgs),

    /// Capture one patch centered on a display pixel of one slice
    Roi(RoiArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Stack to open (.tif, .tiff)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Maximum display size as HEIGHTxWIDTH
    #[arg(long, value_parser = parse_viewport)]
    viewport: Option<(u32, u32)>,

    /// JSON file with extractor settings
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Center pick on the display raster as X,Y
    #[arg(long, value_parser = parse_point)]
    center: Point,

    /// Radius pick on the display raster as X,Y
    #[arg(long, value_parser = parse_point)]
    radius: Point,

    /// Output directory (defaults to the input file stem)
    #[arg(long, value_hint = ValueHint::DirPath)]
    out: Option<PathBuf>,

    /// Seed for patch sampling
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct RoiArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Slice to capture from
    #[arg(long, default_value_t = 0)]
    slice: usize,

    /// Clicked display pixel as X,Y
    #[arg(long, value_parser = parse_point)]
    at: Point,

    /// Output directory (defaults to the input file stem)
    #[arg(long, value_hint = ValueHint::DirPath)]
    out: Option<PathBuf>,
}

fn parse_pair<T: std::str::FromStr>(raw: &str, sep: char) -> Option<(T, T)> {
    let (a, b) = raw.split_once(sep)?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn parse_point(raw: &str) -> std::result::Result<Point, String> {
    parse_pair::<f32>(raw, ',')
        .map(|(x, y)| Point::new(x, y))
        .ok_or_else(|| format!("expected X,Y, got `{raw}`"))
}

fn parse_viewport(raw: &str) -> std::result::Result<(u32, u32), String> {
    parse_pair::<u32>(raw, 'x').ok_or_else(|| format!("expected HEIGHTxWIDTH, got `{raw}`"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn open_session(args: &CommonArgs, seed: Option<u64>) -> Result<Session> {
    let mut config = match &args.config {
        Some(path) => ExtractorConfig::from_json_file(path)?,
        None => ExtractorConfig::default(),
    };
    if args.viewport.is_some() {
        config.viewport = args.viewport;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    Session::open(&VolumeLoader::new(), &args.input, &config)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect(args) => {
            let session = open_session(&args, None)?;
            let volume = session.volume();
            let state = session.display_state();
            info!(
                dims = ?volume.dim(),
                min = ?volume.min(),
                max = ?volume.max(),
                scale_w = state.scale_w,
                scale_h = state.scale_h,
                "stack summary"
            );
            println!(
                "{} slices of {}x{}, display {:?}",
                volume.depth(),
                volume.rows(),
                volume.cols(),
                session.display_size()
            );
        }
        Command::Export(args) => {
            let mut session = open_session(&args.common, args.seed)?;
            let dir = args.out.unwrap_or_else(|| session.export_dir());
            session.arm_pick(PickKind::Center);
            session.click(args.center, &dir)?;
            session.arm_pick(PickKind::Radius);
            session.click(args.radius, &dir)?;
            let summary = session.export_patches(&dir)?;
            println!(
                "{} patches written to {}, {} skipped at volume edges",
                summary.written.len(),
                dir.display(),
                summary.skipped
            );
        }
        Command::Roi(args) => {
            let mut session = open_session(&args.common, None)?;
            let dir = args.out.unwrap_or_else(|| session.export_dir());
            session.navigate(Navigation::Jump(args.slice))?;
            session.set_roi_capture(true);
            match session.click(args.at, &dir)?.captured {
                Some(path) => println!("{}", path.display()),
                None => println!("no patch written: click lies outside the volume or the window crosses an edge"),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

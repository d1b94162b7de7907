//! boardsight CLI: calibrate a board, rectify frames, replay detections.

use boardsight::{
    load_detection_frames, replay, BoardsightConfig, Calibrator, ConfigIoError, GameSession,
    Occupancy, StoreError,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write image {path}: {source}")]
    WriteImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error(transparent)]
    Config(#[from] ConfigIoError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("calibration failed: {0}")]
    Calibration(String),
    #[error("frame could not be rectified with the calibration of {0:?}")]
    Rectify(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "boardsight")]
#[command(about = "Chessboard calibration and move inference from camera frames")]
#[command(version)]
struct Cli {
    /// Log verbosity on stderr. With the `tracing` feature, `RUST_LOG`
    /// overrides it.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate a game from a frame of the empty board and store the mapping.
    Calibrate(CalibrateArgs),

    /// Warp a camera frame to the calibrated top-down view.
    Rectify(RectifyArgs),

    /// Run recorded detections through a game session, one JSON report per line.
    Replay(ReplayArgs),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Game token the calibration is stored under.
    #[arg(long)]
    token: String,

    /// JSON config file; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with `<token>_mapping.json` files (overrides the config).
    #[arg(long)]
    mappings_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Camera frame showing the empty board.
    #[arg(long)]
    image: PathBuf,

    /// Accept the calibration even if pieces seem to be on the board.
    #[arg(long)]
    no_empty_check: bool,
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Camera frame to rectify.
    #[arg(long)]
    image: PathBuf,

    /// Where to write the rectified image; format follows the extension.
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// JSON array of frames, each an array of detections.
    #[arg(long)]
    detections: PathBuf,

    /// Compare the first frame against the standard starting position.
    #[arg(long)]
    from_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn init_logging(level: LogLevel) {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        boardsight::core::init_tracing(level.into(), false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = boardsight::core::init_with_level(level.into());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Rectify(args) => run_rectify(&args),
        Commands::Replay(args) => run_replay(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(common: &CommonArgs) -> CliResult<BoardsightConfig> {
    let mut config = match &common.config {
        Some(path) => BoardsightConfig::load_json(path)?,
        None => BoardsightConfig::default(),
    };
    if let Some(dir) = &common.mappings_dir {
        config.mappings_dir = dir.clone();
    }
    Ok(config)
}

fn open_image(path: &Path) -> CliResult<DynamicImage> {
    info!("loading image: {}", path.display());
    image::open(path).map_err(|source| CliError::ReadImage {
        path: path.to_path_buf(),
        source,
    })
}

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let mut config = load_config(&args.common)?;
    if args.no_empty_check {
        config.calibration.check_empty = false;
    }
    let frame = open_image(&args.image)?;
    let store = config.store();

    let record = Calibrator::new(config.calibration).calibrate_and_store(
        &frame,
        &args.common.token,
        &store,
    )?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    if record.success {
        info!(
            "mapping written to {}",
            store.path_for(&args.common.token)?.display()
        );
        Ok(())
    } else {
        Err(CliError::Calibration(
            record.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

fn run_rectify(args: &RectifyArgs) -> CliResult<()> {
    let config = load_config(&args.common)?;
    let calibration = config.store().load_calibration(&args.common.token)?;
    let frame = open_image(&args.image)?;

    let rectified = if calibration.channels == 1 {
        calibration
            .rectify(&frame.to_luma8())
            .map(DynamicImage::ImageLuma8)
    } else {
        calibration
            .rectify(&frame.to_rgb8())
            .map(DynamicImage::ImageRgb8)
    };
    let rectified = rectified.ok_or_else(|| CliError::Rectify(args.common.token.clone()))?;

    rectified
        .save(&args.output)
        .map_err(|source| CliError::WriteImage {
            path: args.output.clone(),
            source,
        })?;
    info!(
        "rectified {}x{} image written to {}",
        rectified.width(),
        rectified.height(),
        args.output.display()
    );
    Ok(())
}

fn run_replay(args: &ReplayArgs) -> CliResult<()> {
    let mut config = load_config(&args.common)?;
    if args.from_start {
        config.session.initial_occupancy = Some(Occupancy::starting_position());
    }
    let calibration = match config.store().load_calibration(&args.common.token) {
        Ok(c) => Some(c),
        Err(StoreError::NotFound { .. }) => {
            warn!("no calibration for {:?}, frames will not be mapped", args.common.token);
            None
        }
        Err(e) => return Err(e.into()),
    };
    let frames = load_detection_frames(&args.detections)?;

    let mut session = GameSession::standard(args.common.token.clone(), calibration, config.session);
    for report in replay(&mut session, &frames) {
        println!("{}", serde_json::to_string(&report)?);
    }
    if !session.history().is_empty() {
        let sans: Vec<&str> = session.history().iter().map(|m| m.san.as_str()).collect();
        info!("moves: {}", sans.join(" "));
    }
    Ok(())
}

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use tabview::controller::Controller;
use tabview::domain::{COLOR_CYAN, COLOR_YELLOW};
use tabview::loader::LoadedTable;
use tabview::{CrosstermSession, TableView, ViewConfig, ViewError};

/// Browse a delimited text file as an interactive table.
#[derive(Debug, Parser)]
#[command(name = "tabview", version)]
struct Args {
    /// File to show. The first line is the header, lines indented with spaces
    /// are subrows of the line above.
    file: String,

    /// Cell delimiter.
    #[arg(short = 'd', long = "delimiter", default_value_t = '\t')]
    delimiter: char,

    /// Start with row numbers.
    #[arg(short = 'n', long = "numbers")]
    numbers: bool,

    /// Start with subrows visible.
    #[arg(short = 's', long = "subrows")]
    subrows: bool,

    /// Longer cells are cut off with "...".
    #[arg(long = "max-column-width", default_value_t = 80)]
    max_column_width: usize,

    /// Write logs to this file. Filter with RUST_LOG.
    #[arg(long = "log-file")]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("Error: could not open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

// The terminal belongs to the view, so logs only ever go to a file.
fn init_logging(log_file: Option<&str>) -> Result<(), ViewError> {
    let Some(path) = log_file else {
        tracing_subscriber::registry().with(ErrorLayer::default()).init();
        return Ok(());
    };
    let path = shellexpand::tilde(path).into_owned();
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), ViewError> {
    let expanded =
        shellexpand::full(&args.file).map_err(|e| ViewError::LoadingFailed(e.to_string()))?;
    let path = PathBuf::from(expanded.as_ref());
    let table = LoadedTable::read(&path, args.delimiter)?;
    info!("Starting tabview on {}", path.display());

    let mut config = ViewConfig::default().max_column_width(args.max_column_width);
    if let Ok(pager) = std::env::var("PAGER")
        && !pager.trim().is_empty()
    {
        config = config.pager(pager);
    }

    let session = CrosstermSession::init()?;
    let mut view = TableView::new(session, config);
    view.set_header_color(COLOR_CYAN);
    view.set_help_text_color(COLOR_YELLOW);
    table.fill(&mut view);
    if args.subrows {
        view.toggle_subrows();
    }
    if args.numbers {
        view.enable_row_numbers();
    }

    let result = Controller::new().run(&mut view);
    view.into_session().close();
    result
}

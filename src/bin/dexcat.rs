use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dex_catalog::app::{App, SearchStatus};
use dex_catalog::config::{ConfigLoader, ResolvedConfig};
use dex_catalog::domain::EntryId;
use dex_catalog::error::CatalogError;
use dex_catalog::output::{JsonOutput, OutputMode};
use dex_catalog::pokeapi::PokeApiHttpClient;
use dex_catalog::tui::Tui;

#[derive(Parser)]
#[command(name = "dexcat")]
#[command(about = "Browse and search PokeAPI creature data from the terminal")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Open the interactive grid")]
    Browse,
    #[command(about = "Load one page of records as JSON")]
    Page(PageArgs),
    #[command(about = "Search by #id, exact name or name fragment")]
    Search(SearchArgs),
    #[command(about = "Show one record in detail")]
    Show(ShowArgs),
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    start: Option<EntryId>,

    #[arg(long)]
    count: Option<usize>,
}

#[derive(Args)]
struct SearchArgs {
    query: String,
}

#[derive(Args)]
struct ShowArgs {
    id: EntryId,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::NoMatches(_) | CatalogError::InvalidEntryId(_) => 2,
        CatalogError::Http(_) | CatalogError::Status { .. } | CatalogError::Decode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(source) = &config.source {
        tracing::debug!(%source, "loaded config");
    }
    let app = start_app(config)?;

    match cli.command {
        Some(Commands::Browse) => run_browse(app),
        Some(Commands::Page(args)) => run_page(args, &app),
        Some(Commands::Search(args)) => run_search(args, &app),
        Some(Commands::Show(args)) => run_show(args, &app),
        None => match output_mode {
            OutputMode::Interactive => run_browse(app),
            OutputMode::NonInteractive => run_page(
                PageArgs {
                    start: None,
                    count: None,
                },
                &app,
            ),
        },
    }
}

fn start_app(config: ResolvedConfig) -> miette::Result<App<PokeApiHttpClient>> {
    let client = PokeApiHttpClient::new(&config)?;
    Ok(App::start(client, config)?)
}

fn run_browse(app: App<PokeApiHttpClient>) -> miette::Result<()> {
    let mut tui = Tui::new(app.config().compact_width);
    tui.run(Arc::new(app))
}

fn run_page(args: PageArgs, app: &App<PokeApiHttpClient>) -> miette::Result<()> {
    let result = app.page(args.start, args.count, &JsonOutput);
    JsonOutput::print_page(&result).into_diagnostic()
}

fn run_search(args: SearchArgs, app: &App<PokeApiHttpClient>) -> miette::Result<()> {
    let result = app.search(&args.query, &JsonOutput);
    JsonOutput::print_search(&result).into_diagnostic()?;
    if result.status == SearchStatus::NoMatches {
        return Err(CatalogError::NoMatches(args.query).into());
    }
    Ok(())
}

fn run_show(args: ShowArgs, app: &App<PokeApiHttpClient>) -> miette::Result<()> {
    let result = app.show(args.id, &JsonOutput)?;
    JsonOutput::print_show(&result).into_diagnostic()
}

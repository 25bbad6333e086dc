use clap::{Parser, Subcommand};
use ordercheck_core::config::{validate_log_format, validate_log_level, Config};
use ordercheck_core::AppResult;
use std::path::PathBuf;
use std::process;

mod eval;
mod logging;
mod score;

#[derive(Parser)]
#[command(name = "ordercheck")]
#[command(
    about = "Kendall Tau scoring of candidate orderings against simulated transmission histories."
)]
struct Cli {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides `logging.level` from the config file.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Overrides `logging.format` from the config file.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transmissions caused per infector inside the window, most first.
    Count {
        #[arg(long, value_name = "PATH")]
        transmissions: PathBuf,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        from: Option<f64>,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        to: Option<f64>,
    },
    /// Transmission counts listed in candidate order.
    Match {
        #[arg(long, value_name = "PATH")]
        transmissions: PathBuf,
        #[arg(long, value_name = "PATH")]
        ordering: PathBuf,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        from: Option<f64>,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        to: Option<f64>,
    },
    /// Kendall Tau of a candidate ordering against its optimal rearrangement.
    Score {
        #[arg(long, value_name = "PATH")]
        transmissions: PathBuf,
        #[arg(long, value_name = "PATH")]
        ordering: PathBuf,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        from: Option<f64>,
        #[arg(long, value_name = "TIME", allow_negative_numbers = true)]
        to: Option<f64>,
        /// Treat ascending counts as optimal instead of descending.
        #[arg(long)]
        ascending: bool,
    },
    /// Kendall Tau of efficacy values against the ranks n..1.
    ScoreEfficacy {
        #[arg(long, value_name = "PATH")]
        efficacy: PathBuf,
    },
    Eval {
        #[command(subcommand)]
        command: EvalCommands,
    },
    /// Rebuilds the summary JSON for an existing result table.
    Summarize {
        #[arg(long, value_name = "PATH")]
        table: PathBuf,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        /// Suite whose algorithm colours fill the palette.
        #[arg(long, value_name = "PATH")]
        suite: Option<PathBuf>,
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Subcommand)]
enum EvalCommands {
    Generate {
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
    Run {
        #[arg(long, value_name = "PATH")]
        suite: PathBuf,
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Count transmissions in-process even when an efficacy program is configured.
        #[arg(long)]
        native: bool,
        /// Exit non-zero when any replicate failed.
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        overwrite: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{}", err.message());
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> AppResult<()> {
    if let Some(level) = &cli.log_level {
        validate_log_level(level)?;
    }
    if let Some(format) = &cli.log_format {
        validate_log_format(format)?;
    }

    let config = Config::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    logging::init(level, format)?;

    match cli.command {
        Commands::Count {
            transmissions,
            from,
            to,
        } => score::count_command(&transmissions, from, to),
        Commands::Match {
            transmissions,
            ordering,
            from,
            to,
        } => score::match_command(&transmissions, &ordering, from, to),
        Commands::Score {
            transmissions,
            ordering,
            from,
            to,
            ascending,
        } => score::score_command(&transmissions, &ordering, from, to, ascending),
        Commands::ScoreEfficacy { efficacy } => score::score_efficacy_command(&efficacy),
        Commands::Eval { command } => match command {
            EvalCommands::Generate { suite, overwrite } => eval::eval_generate(&suite, overwrite),
            EvalCommands::Run {
                suite,
                out,
                native,
                strict,
                overwrite,
            } => eval::eval_run(&suite, out, native, strict, overwrite, &config),
        },
        Commands::Summarize {
            table,
            out,
            suite,
            overwrite,
        } => eval::summarize_command(&table, &out, suite, overwrite),
    }
}

//! Collects historical responses for a URL from the
//! [Wayback Machine](https://web.archive.org).

#![warn(
    clippy::all,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use env_logger::Env;
use wayback_collector::{
    config::{self, ARCHIVE_URL_ENV_VAR, DEFAULT_ARCHIVE_URL},
    error::Error,
    output::OutputMode,
    wayback::{CdxQuery, WaybackClient},
    Collector,
};

#[derive(Parser, Debug)]
#[clap(about = "Collects historical responses for a URL from the Wayback Machine.")]
struct CliArgs {
    /// URL pattern to collect responses for.
    #[clap(long)]
    url: Option<String>,
    /// Date on which to start collecting responses. Inclusive. Format:
    /// yyyyMMddhhmmss. Defaults to first ever record.
    #[clap(long)]
    from: Option<String>,
    /// Date on which to end collecting responses. Inclusive. Format:
    /// yyyyMMddhhmmss. Defaults to last ever record.
    #[clap(long)]
    to: Option<String>,
    /// Limit the results. 0 means no limit.
    #[clap(long, allow_hyphen_values = true)]
    limit: Option<i32>,
    /// Filter captures using Wayback CDX filters, e.g. `statuscode:200`. May
    /// be repeated.
    #[clap(long)]
    filter: Vec<String>,
    /// Print only the list of snapshot URLs, without fetching them.
    #[clap(long)]
    urls: bool,
    /// Print only unique responses.
    #[clap(long)]
    unique: bool,
    /// Directory in which to save every unique response, one file per
    /// response named by its SHA-1.
    #[clap(long)]
    output: Option<PathBuf>,
    /// Base URL of the Wayback Machine.
    #[clap(long, env = ARCHIVE_URL_ENV_VAR, default_value = DEFAULT_ARCHIVE_URL)]
    archive_url: String,
    /// Shows trace messages, including potentially sensitive HTTP data.
    #[clap(long)]
    trace: bool,
    /// Prints shell completions and exits.
    #[clap(long, arg_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn run_completions(shell: Shell, buf: &mut impl io::Write) {
    clap_complete::generate(shell, &mut CliArgs::command(), "wayback_collector", buf);
}

/// Validates every flag before any network activity.
fn build_query(args: &CliArgs) -> wayback_collector::error::Result<(CdxQuery, OutputMode)> {
    let mut query = CdxQuery::new(args.url.clone().unwrap_or_default())?;
    query.from = args.from.clone();
    query.to = args.to.clone();
    query.limit = args.limit;
    query.filters = args.filter.clone();
    let mode = OutputMode::from_flags(args.urls, args.unique, args.output.as_deref())?;
    Ok((query, mode))
}

async fn try_main(args: CliArgs) -> Result<()> {
    if let Some(shell) = args.completions {
        run_completions(shell, &mut io::stdout());
        return Ok(());
    }

    let (query, mode) = build_query(&args)?;
    let archive_url = config::archive_base_url(&args.archive_url)?;

    let http_client = reqwest::ClientBuilder::new()
        .connection_verbose(args.trace)
        .build()?;
    let wayback = WaybackClient::new(archive_url, &http_client);
    let collector = Collector::new(&wayback, mode);

    let stdout = io::stdout();
    let summary = collector.run(&query, &mut stdout.lock()).await?;
    log::info!(
        "processed {} captures, fetched {}{}",
        summary.history_items,
        summary.fetched,
        summary
            .unique
            .map(|unique| format!(", {} unique", unique))
            .unwrap_or_default()
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let default_log_level = if args.trace { "trace" } else { "info" };
    let mut log_builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_log_level));
    if args.trace {
        log_builder.filter_module("reqwest", log::LevelFilter::Trace);
    }
    log_builder.init();

    if let Err(e) = try_main(args).await {
        eprintln!("{}", e);
        let exit_code = e.downcast_ref::<Error>().map_or(1, Error::exit_code);
        std::process::exit(exit_code);
    }
}

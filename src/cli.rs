use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use atty::Stream;
use clap::{Parser, Subcommand};
use library_search_console::config::{API_BASE_ENV, EXPORT_DIR_ENV};
use library_search_console::page::Page;
use library_search_console::stats::StatsPanel;
use library_search_console::{
    ClientConfig, HighlightSpan, SearchController, SearchOutcome, highlight_segments,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const MATCH_ON: &str = "\x1b[1;33m";
const MATCH_OFF: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(
    name = "library-search-console",
    about = "Drive the library search page from a terminal",
    version
)]
pub struct Cli {
    /// Base URL of the search API.
    #[arg(long, global = true, env = API_BASE_ENV)]
    api_base: Option<String>,

    /// Page URL used to seed the form; searches rewrite its query string.
    #[arg(long, global = true)]
    page_url: Option<String>,

    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Write the rendered page to this file when the command finishes.
    #[arg(long, global = true, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Directory that receives exported responses.
    #[arg(long, global = true, env = EXPORT_DIR_ENV)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Boot the page from a URL and run its query if it carries one.
    Open {
        /// Page URL, e.g. `http://127.0.0.1:8000/?q=whale&mode=graph`.
        url: Option<String>,
    },
    /// Run a single search.
    Search {
        /// Query text.
        query: String,
        /// Search mode: simple, regex or graph.
        #[arg(short, long, default_value = "simple")]
        mode: String,
        /// Ranking order: default, pagerank, closeness or betweenness.
        #[arg(short, long)]
        order: Option<String>,
        /// Export the response as JSON after a successful search.
        #[arg(long)]
        export: bool,
    },
    /// Show index statistics.
    Stats,
    /// Interactive session; type a query per line, `:help` for commands.
    Shell,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(cli: &Cli, page_url: Option<&str>) -> Result<ClientConfig, Box<dyn Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base) = cli.api_base.as_deref() {
        config = config.with_api_base(base)?;
    }
    if let Some(url) = page_url.or(cli.page_url.as_deref()) {
        config = config.with_page_url(url)?;
    }
    if let Some(dir) = cli.export_dir.clone() {
        config.export_dir = dir;
    }
    Ok(config)
}

async fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let page_url = match &cli.command {
        Command::Open { url } => url.as_deref(),
        _ => None,
    };
    let controller = SearchController::new(build_config(&cli, page_url)?)?;

    match &cli.command {
        Command::Open { .. } => handle_open(&controller, cli.json).await?,
        Command::Search {
            query,
            mode,
            order,
            export,
        } => {
            handle_search(&controller, query, mode, order.as_deref(), *export, cli.json).await?
        }
        Command::Stats => handle_stats(&controller, cli.json).await?,
        Command::Shell => handle_shell(&controller, cli.json).await?,
    }

    if let Some(path) = cli.html.as_deref() {
        write_html(&controller, path)?;
    }
    Ok(())
}

async fn handle_open(controller: &SearchController, as_json: bool) -> Result<(), Box<dyn Error>> {
    let outcome = controller.boot().await;
    let page = controller.snapshot();
    if as_json {
        let payload = json!({
            "url": page.url().as_str(),
            "outcome": outcome.as_ref().map(outcome_to_json),
            "stats": &page.stats,
            "state": state_to_json(controller),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_stats(&page.stats);
        if let Some(outcome) = &outcome {
            println!();
            print_outcome(outcome);
            print_page(&page);
        } else {
            println!("\n{}", page.summary);
        }
    }
    Ok(())
}

async fn handle_search(
    controller: &SearchController,
    query: &str,
    mode: &str,
    order: Option<&str>,
    export: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if !controller.select_mode(mode) {
        return Err(format!("Unknown mode {mode:?}; expected simple, regex or graph").into());
    }
    if let Some(order) = order {
        if !controller.select_order(order) {
            return Err(format!("Unknown order {order:?}").into());
        }
    }
    controller.set_query(query);
    let outcome = controller.submit().await;
    let exported = if export && matches!(outcome, SearchOutcome::Completed { .. }) {
        controller.export()?
    } else {
        None
    };

    let page = controller.snapshot();
    if as_json {
        let payload = json!({
            "url": page.url().as_str(),
            "outcome": outcome_to_json(&outcome),
            "summary": &page.summary,
            "state": state_to_json(controller),
            "recommendations": &page.recommendations,
            "exported": exported.as_ref().map(|path| path.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_outcome(&outcome);
        print_page(&page);
        if let Some(path) = exported {
            println!("\nExported to {}", path.display());
        }
    }
    if let SearchOutcome::Failed { message } = outcome {
        return Err(message.into());
    }
    Ok(())
}

async fn handle_stats(controller: &SearchController, as_json: bool) -> Result<(), Box<dyn Error>> {
    let loaded = controller.load_stats().await;
    let page = controller.snapshot();
    if as_json {
        let payload = json!({ "loaded": loaded, "stats": &page.stats });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_stats(&page.stats);
        if !loaded {
            println!("(index statistics unavailable)");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Search(String),
    Mode(String),
    Order(String),
    Export,
    Stats,
    Url,
    Html(PathBuf),
    Dismiss,
    Help,
    Quit,
}

fn parse_shell_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ShellCommand::Search(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |what: &str| -> Result<String, String> {
        if arg.is_empty() {
            Err(format!(":{name} needs {what}"))
        } else {
            Ok(arg.to_string())
        }
    };
    match name {
        "mode" | "m" => required("a mode").map(ShellCommand::Mode),
        "order" | "o" => required("an order").map(ShellCommand::Order),
        "export" | "e" => Ok(ShellCommand::Export),
        "stats" => Ok(ShellCommand::Stats),
        "url" => Ok(ShellCommand::Url),
        "html" => required("a file path").map(|path| ShellCommand::Html(PathBuf::from(path))),
        "dismiss" => Ok(ShellCommand::Dismiss),
        "help" | "h" | "?" => Ok(ShellCommand::Help),
        "quit" | "q" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("Unknown command :{other}; try :help")),
    }
}

async fn handle_shell(controller: &SearchController, as_json: bool) -> Result<(), Box<dyn Error>> {
    handle_open(controller, as_json).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("search> ");
        std::io::stdout().flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let command = match parse_shell_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match command {
            ShellCommand::Search(query) => {
                controller.set_query(&query);
                let outcome = controller.submit().await;
                print_outcome(&outcome);
                print_page(&controller.snapshot());
            }
            ShellCommand::Mode(mode) => {
                if controller.select_mode(&mode) {
                    println!("{}", controller.snapshot().form.mode_tip);
                } else {
                    println!("Unknown mode {mode:?}; expected simple, regex or graph");
                }
            }
            ShellCommand::Order(order) => {
                let visible = controller
                    .snapshot()
                    .form
                    .order
                    .is_some_and(|control| control.visible);
                if !visible {
                    println!("Ordering is fixed to default in this mode.");
                } else if !controller.select_order(&order) {
                    println!("Unknown order {order:?}");
                }
            }
            ShellCommand::Export => match controller.export()? {
                Some(path) => println!("Exported to {}", path.display()),
                None => println!("Nothing to export yet; run a search first."),
            },
            ShellCommand::Stats => {
                controller.load_stats().await;
                print_stats(&controller.snapshot().stats);
            }
            ShellCommand::Url => println!("{}", controller.snapshot().url()),
            ShellCommand::Html(path) => write_html(controller, &path)?,
            ShellCommand::Dismiss => controller.dismiss_error(),
            ShellCommand::Help => print_shell_help(),
            ShellCommand::Quit => break,
        }
    }
    Ok(())
}

fn write_html(controller: &SearchController, path: &Path) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, controller.render_html()?)?;
    eprintln!("Wrote page to {}", path.display());
    Ok(())
}

fn outcome_to_json(outcome: &SearchOutcome) -> serde_json::Value {
    match outcome {
        SearchOutcome::Prompted => json!({ "status": "prompted" }),
        SearchOutcome::Completed { total, shown } => {
            json!({ "status": "completed", "total": total, "shown": shown })
        }
        SearchOutcome::Failed { message } => json!({ "status": "failed", "message": message }),
        SearchOutcome::Superseded => json!({ "status": "superseded" }),
    }
}

fn state_to_json(controller: &SearchController) -> serde_json::Value {
    let state = controller.state();
    json!({
        "last_query": state.last_query,
        "last_mode": state.last_mode,
        "last_order": state.last_order,
        "last_response": state.last_response.map(|captured| captured.body),
    })
}

fn print_outcome(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Failed { message } => println!("Error: {message}"),
        SearchOutcome::Superseded => println!("(superseded by a newer search)"),
        SearchOutcome::Prompted | SearchOutcome::Completed { .. } => {}
    }
}

fn print_page(page: &Page) {
    println!("{}", page.summary);
    if let Some(message) = page.empty_state.as_deref() {
        println!("{message}");
    }
    let color = stdout_is_tty();
    for card in &page.results {
        println!("\n{:>4}  {}", card.rank, card.title);
        println!(
            "      {} · {} · {}",
            card.authors, card.language, card.length
        );
        println!("      {}", emphasise(&card.snippet, &page.form.query, color));
        if !card.badges.is_empty() {
            println!("      [{}]", card.badges.join("] ["));
        }
    }
    if !page.recommendations.is_empty() {
        println!("\nRecommended titles:");
        let width = page
            .recommendations
            .iter()
            .map(|card| card.title.chars().count())
            .max()
            .unwrap_or(5)
            .max("TITLE".len());
        println!("{:<width$}  {}", "TITLE", "REASON", width = width);
        println!("{:-<width$}  {}", "", "------", width = width);
        for card in &page.recommendations {
            println!("{:<width$}  {}", card.title, card.reason, width = width);
        }
    }
}

fn print_stats(stats: &StatsPanel) {
    let rows = [
        ("Documents", stats.documents.as_str()),
        ("Average length", stats.avg_doc_length.as_str()),
        ("Terms", stats.terms.as_str()),
        ("Last full build", stats.last_full_build.as_str()),
    ];
    let width = rows
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(5);
    println!("{:<width$}  {}", "STAT", "VALUE", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for (label, value) in rows {
        println!("{:<width$}  {}", label, value, width = width);
    }
}

fn print_shell_help() {
    println!("<query>          search with the current mode and order");
    println!(":mode <name>     simple, regex or graph");
    println!(":order <name>    default, pagerank, closeness or betweenness");
    println!(":export          write the last response as JSON");
    println!(":stats           reload index statistics");
    println!(":url             show the synced page URL");
    println!(":html <path>     write the rendered page");
    println!(":dismiss         hide the error banner");
    println!(":quit            leave the shell");
}

fn emphasise(text: &str, query: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    highlight_segments(text, query.trim())
        .into_iter()
        .map(|span| match span {
            HighlightSpan::Plain(part) => part.to_string(),
            HighlightSpan::Match(part) => format!("{MATCH_ON}{part}{MATCH_OFF}"),
        })
        .collect()
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

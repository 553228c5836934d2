//! askql - parse, inspect and hash `#ask` queries
//!
//! Usage:
//!   askql parse '[[Category:City]]' '?Population' 'limit=10'
//!   askql repl
//!
//! REPL commands:
//!   :help            - Show help
//!   :quit            - Exit REPL
//!   :context <name>  - Switch between inline, special and concept
//!   :json            - Toggle JSON output

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::EnvFilter;

use askql::{
    format_query_errors, AlgebraConfig, Config, Query, QueryContext, QueryProcessor, StaticSchema,
};

const PROMPT: &str = "ask> ";

#[derive(Parser)]
#[command(name = "askql")]
#[command(about = "Parser and canonicalizer for the #ask query language")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one query given as raw parameters
    Parse {
        /// Query text, `?Printout` statements and `name=value` parameters
        #[arg(required = true)]
        params: Vec<String>,

        /// Context the query is embedded in
        #[arg(long, value_enum, default_value = "inline")]
        context: Context,

        /// Print the serializable form as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session
    Repl,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Context {
    Inline,
    Special,
    Concept,
}

impl From<Context> for QueryContext {
    fn from(context: Context) -> Self {
        match context {
            Context::Inline => QueryContext::Inline,
            Context::Special => QueryContext::SpecialPage,
            Context::Concept => QueryContext::Concept,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    let schema = config.schema.build();

    match cli.command {
        Commands::Parse {
            params,
            context,
            json,
        } => {
            let raw: Vec<&str> = params.iter().map(String::as_str).collect();
            let processor = QueryProcessor::new(config.query.clone(), &schema);
            let query = processor.process(&raw, context.into());
            report(&query, &config.query.algebra(), json);
            if !query.errors().is_empty() {
                std::process::exit(2);
            }
        }
        Commands::Repl => repl(&config, &schema),
    }
}

/// Print a query summary (or its JSON form) and its errors
fn report(query: &Query, algebra: &AlgebraConfig, json: bool) {
    if json {
        match serde_json::to_string_pretty(&query.to_serializable()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: {}", e),
        }
        println!("hash: {}", query.content_hash());
    } else {
        let description = query.resolved_description();
        println!("conditions: {}", description);
        println!(
            "size: {}  depth: {}  features: {}",
            description.size(algebra),
            description.depth(),
            description.query_features()
        );
        println!("limit: {}  offset: {}", query.limit(), query.offset());
        for printout in query.extra_printouts() {
            println!("printout: {}", printout.serialization());
        }
        println!("id: {}", query.query_id());
    }
    if !query.errors().is_empty() {
        // Spans index into the conditions text, not the raw parameters
        let source = query.query_string();
        eprint!("{}", format_query_errors(&source, query.errors()));
    }
}

fn repl(config: &Config, schema: &StaticSchema) {
    println!("askql v{} - type :help for help, :quit to exit", env!("CARGO_PKG_VERSION"));

    let processor = QueryProcessor::new(config.query.clone(), schema);
    let algebra = config.query.algebra();
    let mut context = QueryContext::Inline;
    let mut json = false;

    let rl_config = rustyline::Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), DefaultHistory> =
        Editor::with_config(rl_config).expect("Failed to create editor");

    let history_path = history_path();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(command) = line.strip_prefix(':') {
                    let mut words = command.split_whitespace();
                    match (words.next(), words.next()) {
                        (Some("quit") | Some("q"), _) => break,
                        (Some("help") | Some("h"), _) => print_help(),
                        (Some("json"), _) => {
                            json = !json;
                            println!("JSON output {}", if json { "on" } else { "off" });
                        }
                        (Some("context"), Some(name)) => match Context::from_str(name, true) {
                            Ok(c) => {
                                context = c.into();
                                println!("Context: {:?}", context);
                            }
                            Err(_) => eprintln!("Unknown context '{}'", name),
                        },
                        _ => eprintln!("Unknown command ':{}'. Try :help", command),
                    }
                    continue;
                }
                let raw: Vec<&str> = line.split('|').collect();
                let query = processor.process(&raw, context);
                report(&query, &algebra, json);
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use :quit or Ctrl-D to exit");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }
}

fn print_help() {
    println!("Enter a query with optional parameters separated by |, e.g.");
    println!("  [[Category:City]] [[Population::>1000]] | ?Population | limit=10");
    println!();
    println!("Commands:");
    println!("  :context <inline|special|concept>  Switch query context");
    println!("  :json                              Toggle JSON output");
    println!("  :help                              Show this help");
    println!("  :quit                              Exit");
}

/// Get the history file path
fn history_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("askql");
        path.push("history");
        path
    })
}

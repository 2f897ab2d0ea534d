//! Live Template CLI
//!
//! Usage:
//!   live-template [OPTIONS] [FILE]
//!
//! Options:
//!   -d, --data <FILE>     Data file (JSON, or TOML by extension)
//!   -c, --config <FILE>   Engine configuration (TOML format)
//!   -p, --prefix <PREFIX> Plugin name prefix (default: tpl-)
//!   --require-prefix      Only prefixed names trigger plugins
//!   --set <KEY=VALUE>     Assign a value after the first render
//!   -v, --verbose         Log compilation and refreshes to stderr
//!   -h, --help            Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use live_template::{compile, Context, EngineConfig};

#[derive(Parser)]
#[command(name = "live-template")]
#[command(about = "Render reactive HTML templates against JSON data")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Data file: JSON, or TOML when the extension is .toml
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plugin name prefix, overriding the configuration
    #[arg(short, long)]
    prefix: Option<String>,

    /// Only prefixed names trigger plugins, so plain HTML attributes such as
    /// `for` are left alone
    #[arg(long)]
    require_prefix: bool,

    /// Assign `key=value` (dotted key, JSON or plain string value) after the
    /// first render; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    sets: Vec<String>,

    /// Log compilation and refreshes (debug level)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(prefix) = cli.prefix {
        config.prefix = prefix;
    }
    if cli.require_prefix {
        config.require_prefix = true;
    }
    if config.base_path.is_none() {
        config.base_path = cli
            .input
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
    }

    // Load data
    let data = match &cli.data {
        Some(path) => match load_data(path) {
            Ok(value) => value,
            Err(message) => {
                eprintln!("Error reading data '{}': {}", path.display(), message);
                std::process::exit(1);
            }
        },
        None => Value::Object(Default::default()),
    };

    // Read input
    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let filename = cli
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    match run(&source, data, &cli.sets, &config) {
        Ok(html) => {
            println!("{}", html);
        }
        Err(live_template::Error::Parse(errors)) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(
    source: &str,
    data: Value,
    sets: &[String],
    config: &EngineConfig,
) -> Result<String, live_template::Error> {
    let mut template = compile(source, config)?;
    let ctx = Context::from_value(data)?;
    template.bind_ctx(&ctx)?;

    for assignment in sets {
        let (key, value) = parse_assignment(assignment);
        ctx.set_path(key, value);
    }
    template.flush()?;

    Ok(template.to_html())
}

fn load_data(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }
}

/// `key=value`; the value is JSON if it parses as JSON, else a string
fn parse_assignment(assignment: &str) -> (&str, Value) {
    let (key, raw) = assignment.split_once('=').unwrap_or((assignment, ""));
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    (key.trim(), value)
}

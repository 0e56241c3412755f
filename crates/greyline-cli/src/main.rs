//! Command-line front end for greyline.
//!
//! Resolves selectors and runs condition waits against an accessibility
//! hierarchy dump on disk. The dump is re-read on every poll, so an agent
//! that keeps rewriting it can be waited on from a shell script.
//!
//! # Usage
//!
//! ```bash
//! # Find the visible, interactable element with an accessibility id
//! greyline --tree hierarchy.json find login-button
//!
//! # Find by text, including off-screen elements, second match
//! greyline --tree hierarchy.json find "Row" --by text --raw --index 1
//!
//! # List addressable elements as JSON
//! greyline --tree hierarchy.json --format json list
//!
//! # Wait up to 5s for a spinner to go away, polling every 100ms
//! greyline --tree hierarchy.json wait-for-not spinner -o 5000 --poll-ms 100
//!
//! # Check that the app's key window is on screen
//! GREYLINE_TREE=hierarchy.json greyline check-window
//!
//! # Show the effective configuration
//! greyline config
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use greyline_core::config::{ConfigError, GreylineConfig};
use greyline_core::element::{ElementFrame, UIElement};
use greyline_core::query::QueryError;
use greyline_core::screen::Screen;
use greyline_core::selector::{
    button_by_title, element_by_class, element_by_id, element_by_text, Selector,
};
use greyline_core::tree::{FileTree, TreeQuery};
use greyline_core::wait::{duration_millis, WaitOutcome};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Selector lookups and condition waits against hierarchy snapshots.
#[derive(Parser)]
#[command(name = "greyline")]
#[command(about = "Query and wait on UI elements in an accessibility hierarchy dump")]
#[command(version)]
struct Cli {
    /// Path to the hierarchy JSON (a root element or an array of roots)
    #[arg(short, long, env = "GREYLINE_TREE")]
    tree: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Config file to use instead of ~/.greyline/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MatchBy {
    Id,
    Text,
    Button,
    Class,
    Label,
}

#[derive(clap::Args)]
struct SelectorArgs {
    /// Value to match (glob wildcards `*` and `?` allowed for id, text and label)
    value: String,
    /// What the value is matched against
    #[arg(short, long, default_value = "id")]
    by: MatchBy,
    /// Skip the visibility and interactability filters
    #[arg(long)]
    raw: bool,
    /// Pick the match at this index when several elements match
    #[arg(short, long)]
    index: Option<usize>,
}

#[derive(clap::Args)]
struct WaitArgs {
    /// Timeout in milliseconds
    #[arg(short = 'o', long, env = "GREYLINE_TIMEOUT")]
    timeout: Option<u64>,
    /// Poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a selector to exactly one element
    Find {
        #[command(flatten)]
        selector: SelectorArgs,
    },

    /// List elements that have an identifier or label
    List,

    /// Wait for an element to appear
    WaitFor {
        #[command(flatten)]
        selector: SelectorArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Wait for an element to disappear
    WaitForNot {
        #[command(flatten)]
        selector: SelectorArgs,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Check that the key window is visible
    CheckWindow,

    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    Failed(String),
    Input(String),
    Config(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Failed(_) => ExitCode::from(1),
            CliError::Input(_) => ExitCode::from(2),
            CliError::Config(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Failed(msg) => write!(f, "{}", msg),
            CliError::Input(msg) => write!(f, "Input error: {}", msg),
            CliError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Backend(msg) => CliError::Input(msg),
            other => CliError::Failed(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

type FileScreen = Screen<TreeQuery<FileTree>>;

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Config => show_config(&config, &cli),
        Command::Find { ref selector } => {
            let screen = open_screen(&cli, &config)?;
            find(&screen, &build_selector(selector), &cli)
        }
        Command::List => {
            let screen = open_screen(&cli, &config)?;
            list(&screen, &cli)
        }
        Command::WaitFor { ref selector, ref wait } => {
            let config = with_wait_overrides(config, wait);
            let screen = open_screen(&cli, &config)?;
            let outcome = screen.wait_until_appears(&build_selector(selector), screen.default_timeout());
            report_wait(outcome, &cli)
        }
        Command::WaitForNot { ref selector, ref wait } => {
            let config = with_wait_overrides(config, wait);
            let screen = open_screen(&cli, &config)?;
            let outcome = screen.wait_until_gone(&build_selector(selector), screen.default_timeout());
            report_wait(outcome, &cli)
        }
        Command::CheckWindow => {
            let screen = open_screen(&cli, &config)?;
            screen.assert_key_window_visible()?;
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "success": true }));
            } else if !cli.quiet {
                eprintln!("Key window is visible");
            }
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<GreylineConfig, CliError> {
    match cli.config {
        Some(ref path) => GreylineConfig::load_from(path)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e))),
        None => Ok(GreylineConfig::load()),
    }
}

fn with_wait_overrides(mut config: GreylineConfig, wait: &WaitArgs) -> GreylineConfig {
    if let Some(timeout) = wait.timeout {
        config.default_timeout_ms = timeout;
    }
    if let Some(poll_ms) = wait.poll_ms {
        config.poll_interval_ms = poll_ms;
    }
    config
}

fn open_screen(cli: &Cli, config: &GreylineConfig) -> Result<FileScreen, CliError> {
    let path = cli
        .tree
        .clone()
        .ok_or_else(|| CliError::Input("no hierarchy file given (use --tree or GREYLINE_TREE)".to_string()))?;
    debug!(tree = %path.display(), "opening hierarchy");
    Ok(Screen::new(TreeQuery::new(FileTree::new(path))).configured(config)?)
}

fn build_selector(args: &SelectorArgs) -> Selector {
    let value = args.value.clone();
    let selector = match (args.by, args.raw) {
        (MatchBy::Id, false) => element_by_id(value),
        (MatchBy::Id, true) => Selector::AccessibilityId(value),
        (MatchBy::Text, false) => element_by_text(value),
        (MatchBy::Text, true) => Selector::Text(value),
        (MatchBy::Button, false) => button_by_title(value),
        (MatchBy::Button, true) => Selector::ButtonTitle(value),
        (MatchBy::Class, false) => element_by_class(value),
        (MatchBy::Class, true) => Selector::Class(value),
        (MatchBy::Label, false) => Selector::Label(value)
            .and(Selector::SufficientlyVisible)
            .and(Selector::Interactable),
        (MatchBy::Label, true) => Selector::Label(value),
    };
    match args.index {
        Some(index) => selector.at_index(index),
        None => selector,
    }
}

fn find(screen: &FileScreen, selector: &Selector, cli: &Cli) -> Result<(), CliError> {
    let handle = screen.element(selector)?;
    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "path": handle.path(),
            "element": element_to_concise_json(handle.element()),
        });
        println!("{}", output);
    } else {
        println!("{}", format_element_pretty(handle.element()));
    }
    Ok(())
}

fn list(screen: &FileScreen, cli: &Cli) -> Result<(), CliError> {
    let elements = screen.query().list_elements()?;
    if cli.format == OutputFormat::Json {
        let concise: Vec<serde_json::Value> = elements.iter().map(element_to_concise_json).collect();
        println!("{}", serde_json::Value::Array(concise));
    } else {
        for element in &elements {
            println!("{}", format_element_pretty(element));
        }
    }
    if !cli.quiet {
        eprintln!("{} elements", elements.len());
    }
    Ok(())
}

fn report_wait(outcome: WaitOutcome, cli: &Cli) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "condition": outcome.condition,
            "satisfied": outcome.satisfied,
            "elapsed_ms": duration_millis(outcome.elapsed),
            "polls": outcome.polls,
            "last_error": outcome.last_error.as_ref().map(|e| e.to_string()),
        });
        println!("{}", output);
    } else if outcome.satisfied && !cli.quiet {
        eprintln!("Satisfied after {}", format_elapsed(outcome.elapsed));
    }

    match outcome.into_result() {
        Ok(_) => Ok(()),
        Err(timeout) => match timeout.last_error {
            Some(QueryError::Backend(msg)) => Err(CliError::Input(msg)),
            _ => Err(CliError::Failed(timeout.to_string())),
        },
    }
}

fn show_config(config: &GreylineConfig, cli: &Cli) -> Result<(), CliError> {
    config.validate()?;
    let path = cli.config.clone().unwrap_or_else(GreylineConfig::default_path);
    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        });
        println!("{}", output);
    } else {
        println!("path: {}", path.display());
        println!("default_timeout_ms: {}", config.default_timeout_ms);
        println!("poll_interval_ms: {}", config.poll_interval_ms);
        println!("scroll_amount: {}", config.scroll_amount);
        println!("max_scroll_attempts: {}", config.max_scroll_attempts);
    }
    Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Serialize a UIElement concisely: no null fields, rounded frame values.
fn element_to_concise_json(elem: &UIElement) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    if let Some(ref t) = elem.element_type {
        map.insert("type".into(), serde_json::Value::String(t.clone()));
    }
    if let Some(ref id) = elem.identifier {
        map.insert("id".into(), serde_json::Value::String(id.clone()));
    }
    if let Some(ref label) = elem.label {
        map.insert("label".into(), serde_json::Value::String(label.clone()));
    }
    if let Some(ref value) = elem.value {
        map.insert("value".into(), serde_json::Value::String(value.clone()));
    }
    if let Some(ref frame) = elem.frame {
        map.insert("frame".into(), frame_to_rounded_json(frame));
    }
    map.insert("visible".into(), serde_json::Value::Bool(elem.is_sufficiently_visible()));
    map.insert("interactable".into(), serde_json::Value::Bool(elem.is_interactable()));
    serde_json::Value::Object(map)
}

fn frame_to_rounded_json(frame: &ElementFrame) -> serde_json::Value {
    serde_json::json!({
        "x": frame.x.round() as i64,
        "y": frame.y.round() as i64,
        "width": frame.width.round() as i64,
        "height": frame.height.round() as i64,
    })
}

/// Format an element as `[Type] id "label" =value @(x,y)`, flagging off-screen ones.
fn format_element_pretty(elem: &UIElement) -> String {
    let mut parts = Vec::new();
    let elem_type = elem.element_type.as_deref().unwrap_or("Unknown");
    parts.push(format!("[{}]", elem_type));
    if let Some(ref id) = elem.identifier {
        parts.push(id.clone());
    }
    if let Some(ref label) = elem.label {
        parts.push(format!("\"{}\"", label));
    }
    if let Some(ref value) = elem.value {
        parts.push(format!("={}", value));
    }
    if let Some(ref frame) = elem.frame {
        parts.push(format!("@({:.0},{:.0})", frame.x, frame.y));
    }
    if !elem.is_sufficiently_visible() {
        parts.push("(hidden)".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: &str, by: MatchBy, raw: bool, index: Option<usize>) -> SelectorArgs {
        SelectorArgs {
            value: value.to_string(),
            by,
            raw,
            index,
        }
    }

    #[test]
    fn test_build_selector_default_filters() {
        let selector = build_selector(&args("save", MatchBy::Id, false, None));
        assert_eq!(selector, element_by_id("save"));

        let label = build_selector(&args("Save", MatchBy::Label, false, None));
        assert_eq!(label.to_string(), "label `Save` + sufficiently visible + interactable");
    }

    #[test]
    fn test_build_selector_raw_with_index() {
        let selector = build_selector(&args("Row", MatchBy::Text, true, Some(2)));
        assert_eq!(selector, Selector::Text("Row".to_string()).at_index(2));
    }

    #[test]
    fn test_wait_overrides() {
        let wait = WaitArgs {
            timeout: Some(250),
            poll_ms: None,
        };
        let config = with_wait_overrides(GreylineConfig::default(), &wait);
        assert_eq!(config.default_timeout_ms, 250);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_format_element_pretty() {
        let elem = UIElement {
            identifier: Some("save".to_string()),
            label: Some("Save".to_string()),
            element_type: Some("Button".to_string()),
            frame: Some(ElementFrame { x: 10.4, y: 20.6, width: 80.0, height: 44.0 }),
            ..Default::default()
        };
        assert_eq!(format_element_pretty(&elem), "[Button] save \"Save\" @(10,21)");

        let hidden = UIElement {
            visible_fraction: Some(0.2),
            ..elem
        };
        assert!(format_element_pretty(&hidden).ends_with("(hidden)"));
    }

    #[test]
    fn test_backend_errors_are_input_errors() {
        let err: CliError = QueryError::Backend("cannot read tree.json".to_string()).into();
        assert!(matches!(err, CliError::Input(_)));

        let err: CliError = QueryError::NoMatch { selector: "id `x`".to_string() }.into();
        assert!(matches!(err, CliError::Failed(_)));
    }
}

//! SafeMark CLI - Convert SafeMark text to sanitized HTML
//!
//! Usage:
//!   safemark [OPTIONS] [COMMAND] [FILE]
//!
//! Commands:
//!   convert   Print the HTML fragment (default)
//!   stats     Show document and output statistics

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use log::{debug, info};
use safemark_core::{ConvertError, Converter, FilterResult, Link, LinkFilter};
use serde::Serialize;
use thiserror::Error;

fn main() {
    let args: Vec<String> = env::args().collect();

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let default_level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&config) {
        eprintln!("error: {}", e);
        process::exit(e.exit_code());
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        CliError::Message(message)
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Message(_) => 1,
            CliError::Convert(e) if e.is_too_complex() => 2,
            CliError::Convert(_) => 1,
        }
    }
}

fn run(config: &Config) -> Result<(), CliError> {
    let input = read_input(config.file.as_deref())?;
    let converter = build_converter(config);
    debug!("converter: {:?}", converter);

    match config.command {
        Command::Convert => cmd_convert(&converter, &input, config),
        Command::Stats => cmd_stats(&converter, &input),
    }
}

fn read_input(file: Option<&str>) -> Result<String, String> {
    match file {
        None | Some("-") => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            Ok(input)
        }
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {}", path, e))
        }
    }
}

#[derive(Debug)]
struct Config {
    command: Command,
    file: Option<String>,
    links: LinkPolicy,
    max_depth: Option<usize>,
    format: OutputFormat,
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Convert,
    Stats,
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Html,
    Json,
}

/// Which links are allowed to become anchors.
#[derive(Debug, Clone, PartialEq)]
enum LinkPolicy {
    /// Mangle every link.
    None,
    /// Keep every link.
    All,
    /// Keep links to these hosts.
    Hosts(Vec<String>),
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut command = Command::Convert;
    let mut format = OutputFormat::Html;
    let mut verbose = false;
    let mut links = LinkPolicy::None;
    let mut max_depth = None;
    let mut file = None;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("safemark {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "-j" | "--json" => format = OutputFormat::Json,
            "--allow-links" => links = LinkPolicy::All,
            "--allow-host" => {
                i += 1;
                let host = args
                    .get(i)
                    .ok_or_else(|| "--allow-host needs a host name".to_string())?;
                let host = host.to_ascii_lowercase();
                links = match links {
                    LinkPolicy::Hosts(mut hosts) => {
                        hosts.push(host);
                        LinkPolicy::Hosts(hosts)
                    }
                    LinkPolicy::None => LinkPolicy::Hosts(vec![host]),
                    LinkPolicy::All => LinkPolicy::All,
                };
            }
            "--max-depth" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--max-depth needs a number".to_string())?;
                let depth = value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --max-depth value: {}", value))?;
                max_depth = Some(depth);
            }
            "convert" => command = Command::Convert,
            "stats" => command = Command::Stats,
            "-" => file = Some(arg.clone()),
            _ if arg.starts_with('-') => {
                return Err(format!("unknown option: {}", arg));
            }
            _ => {
                if file.is_some() {
                    return Err("multiple files specified".to_string());
                }
                file = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(Config {
        command,
        file,
        links,
        max_depth,
        format,
        verbose,
    })
}

fn print_help() {
    eprintln!(
        r#"safemark - convert SafeMark text to sanitized HTML

USAGE:
    safemark [OPTIONS] [COMMAND] [FILE]

Reads standard input when FILE is omitted or is "-".

COMMANDS:
    convert     Print the HTML fragment (default)
    stats       Show document and output statistics

OPTIONS:
    --allow-links         Turn every link into an anchor
    --allow-host <HOST>   Turn links to HOST into anchors (repeatable)
    --max-depth <N>       Fail on nesting deeper than N levels
    -j, --json            Output in JSON format
    -v, --verbose         Log conversion details to stderr
    -h, --help            Print help information
    -V, --version         Print version information

EXAMPLES:
    safemark comment.txt                         Convert a file
    safemark --allow-host example.com note.txt   Keep links to example.com
    echo '*hi*' | safemark -j                    Convert stdin to JSON
    safemark stats comment.txt                   Show statistics
"#
    );
}

// =============================================================================
// Link Filters
// =============================================================================

/// Accepts links whose host is on the list.
struct HostAllowList {
    hosts: Vec<String>,
}

impl HostAllowList {
    /// Host part of a `scheme://host[:port]/path` URL, lowercased.
    ///
    /// Browsers end the authority at a backslash as well as at `/`, `?` and
    /// `#`. URLs carrying userinfo (`user@host`) have no host here, so they
    /// never match.
    fn host_of(url: &str) -> Option<String> {
        let (_, rest) = url.split_once("://")?;
        let authority = rest
            .split(|c: char| matches!(c, '/' | '\\' | '?' | '#'))
            .next()
            .unwrap_or(rest);
        if authority.contains('@') {
            return None;
        }
        let host = authority.split(':').next().unwrap_or(authority);
        (!host.is_empty()).then(|| host.to_ascii_lowercase())
    }
}

impl LinkFilter for HostAllowList {
    fn filter(&self, link: &Link) -> FilterResult {
        let host = link.url.as_deref().and_then(Self::host_of);
        match host {
            Some(host) if self.hosts.iter().any(|h| *h == host) => {
                info!("keeping link to {}", host);
                FilterResult::Accept
            }
            _ => FilterResult::Reject,
        }
    }
}

fn build_converter(config: &Config) -> Converter {
    let mut converter = Converter::new();
    if let Some(depth) = config.max_depth {
        converter = converter.with_max_depth(depth);
    }
    match &config.links {
        LinkPolicy::None => converter,
        LinkPolicy::All => converter.with_link_filter(|_: &Link| FilterResult::Accept),
        LinkPolicy::Hosts(hosts) => converter.with_link_filter(HostAllowList {
            hosts: hosts.clone(),
        }),
    }
}

// =============================================================================
// Convert Command
// =============================================================================

#[derive(Serialize)]
struct JsonOutput<'a> {
    html: Option<&'a str>,
    error: Option<JsonError>,
}

#[derive(Serialize)]
struct JsonError {
    kind: &'static str,
    message: String,
}

fn cmd_convert(converter: &Converter, input: &str, config: &Config) -> Result<(), CliError> {
    let result = converter.convert(input);

    match config.format {
        OutputFormat::Html => {
            let html = result?;
            println!("{}", html);
            Ok(())
        }
        OutputFormat::Json => {
            let output = match &result {
                Ok(html) => JsonOutput {
                    html: Some(html.as_str()),
                    error: None,
                },
                Err(e) => JsonOutput {
                    html: None,
                    error: Some(JsonError {
                        kind: "too_complex",
                        message: e.to_string(),
                    }),
                },
            };
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| format!("failed to serialize output: {}", e))?;
            println!("{}", json);
            result?;
            Ok(())
        }
    }
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(converter: &Converter, input: &str) -> Result<(), CliError> {
    let html = converter.convert(input)?;
    let stats = OutputStats::from_html(&html, input);

    println!("Document Statistics");
    println!("-------------------");
    println!("Input:");
    println!("  Characters:     {}", stats.chars);
    println!("  Words (est.):   {}", stats.words);
    println!("  Lines:          {}", stats.lines);
    println!();
    println!("Output:");
    println!("  Bytes:          {}", html.len());
    println!("  Paragraphs:     {}", stats.paragraphs);
    println!("  Lists:          {}", stats.lists);
    println!("  List items:     {}", stats.list_items);
    println!("  Quotes:         {}", stats.quotes);
    println!("  Code blocks:    {}", stats.code_blocks);
    println!("  Links:          {}", stats.links);

    Ok(())
}

struct OutputStats {
    paragraphs: usize,
    lists: usize,
    list_items: usize,
    quotes: usize,
    code_blocks: usize,
    links: usize,
    chars: usize,
    words: usize,
    lines: usize,
}

impl OutputStats {
    /// Count opening tags. Text never contains a raw `<`, so a plain
    /// substring count is exact.
    fn from_html(html: &str, input: &str) -> Self {
        Self {
            paragraphs: html.matches("<p>").count(),
            lists: html.matches("<ul>").count(),
            list_items: html.matches("<li>").count(),
            quotes: html.matches("<blockquote>").count(),
            code_blocks: html.matches("<pre>").count(),
            links: html.matches("<a ").count() + html.matches("<a>").count(),
            chars: input.chars().count(),
            words: input.split_whitespace().count(),
            lines: input.lines().count(),
        }
    }
}

//! odlister CLI — parse a single already-or-freshly-fetched directory
//! listing page and print the resulting tree.
//!
//! This binary deliberately does not crawl: it exercises the parser core
//! on one page at a time, the same unit the core's public API operates on.

use clap::{Parser, Subcommand};
use odlister_core::{ConcurrencyCap, HttpFetcher, ParseError, ParsedDirectory, ParserConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "odlister", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of a human-readable tree
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one directory listing page
    Parse {
        /// The page's own URL (used to resolve relative links)
        url: String,

        /// Read HTML from this file instead of fetching `url`
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Skip the parent-scope containment check
        #[arg(long)]
        no_check_parents: bool,

        /// Path to a TOML config overriding whitelist/defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[cfg(feature = "fetch")]
struct ReqwestFetcher(reqwest::Client);

#[cfg(feature = "fetch")]
#[async_trait::async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ParseError> {
        self.0
            .get(url)
            .send()
            .await
            .map_err(|e| ParseError::SubfetchFailure(e.to_string()))?
            .text()
            .await
            .map_err(|e| ParseError::SubfetchFailure(e.to_string()))
    }
}

fn load_config(path: Option<PathBuf>) -> ParserConfig {
    match path {
        None => ParserConfig::default(),
        Some(p) => {
            let raw = std::fs::read_to_string(&p).unwrap_or_else(|e| {
                eprintln!("Could not read config {}: {e}", p.display());
                std::process::exit(1);
            });
            ParserConfig::from_toml_str(&raw).unwrap_or_else(|e| {
                eprintln!("Invalid config {}: {e}", p.display());
                std::process::exit(1);
            })
        }
    }
}

fn print_tree(dir: &ParsedDirectory, indent: usize) {
    let pad = "  ".repeat(indent);
    let dialect = dir.parser.map(|d| d.as_str()).unwrap_or("unmatched");
    println!("{pad}{} [{dialect}]{}", dir.name, if dir.error { " (error)" } else { "" });
    for sub in &dir.subdirectories {
        print_tree(&sub.read().unwrap(), indent + 1);
    }
    for f in &dir.files {
        let size = if f.file_size < 0 { "?".to_string() } else { f.file_size.to_string() };
        println!("{pad}  {} ({size} bytes)", f.file_name);
    }
}

#[derive(serde::Serialize)]
struct TreeNode {
    name: String,
    url: String,
    parser: Option<&'static str>,
    error: bool,
    header_count: usize,
    files: Vec<odlister_core::ParsedFile>,
    subdirectories: Vec<TreeNode>,
}

fn to_tree_node(dir: &ParsedDirectory) -> TreeNode {
    TreeNode {
        name: dir.name.clone(),
        url: dir.url.clone(),
        parser: dir.parser.map(|d| d.as_str()),
        error: dir.error,
        header_count: dir.header_count,
        files: dir.files.clone(),
        subdirectories: dir.subdirectories.iter().map(|s| to_tree_node(&s.read().unwrap())).collect(),
    }
}

fn print_json(dir: &ParsedDirectory) {
    println!("{}", serde_json::to_string_pretty(&to_tree_node(dir)).unwrap());
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("odlister=warn".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { url, html_file, no_check_parents, config } => {
            let html = match html_file {
                Some(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
                    eprintln!("Could not read {}: {e}", path.display());
                    std::process::exit(1);
                }),
                None => {
                    #[cfg(feature = "fetch")]
                    {
                        let resp = reqwest::get(&url).await.unwrap_or_else(|e| {
                            eprintln!("Fetch failed: {e}");
                            std::process::exit(1);
                        });
                        resp.text().await.unwrap_or_else(|e| {
                            eprintln!("Could not read response body: {e}");
                            std::process::exit(1);
                        })
                    }
                    #[cfg(not(feature = "fetch"))]
                    {
                        eprintln!("Built without the `fetch` feature; pass --html-file instead.");
                        std::process::exit(1);
                    }
                }
            };

            let cfg = load_config(config);
            let shell = ParsedDirectory::shell(url, None);

            #[cfg(feature = "fetch")]
            let fetcher = ReqwestFetcher(reqwest::Client::new());
            #[cfg(feature = "fetch")]
            let fetcher_ref: Option<&dyn HttpFetcher> = Some(&fetcher);
            #[cfg(not(feature = "fetch"))]
            let fetcher_ref: Option<&dyn HttpFetcher> = None;

            // `--no-check-parents` forces the check off; otherwise the config's
            // own `check_parents` (TOML-overridable, default true) decides.
            let check_parents = cfg.check_parents && !no_check_parents;

            let cap = ConcurrencyCap::new(1);
            let result = odlister_core::parse_html_with(&cap, &cfg, shell, &html, fetcher_ref, check_parents).await;

            match result {
                Ok(dir) => {
                    if cli.json {
                        print_json(&dir);
                    } else {
                        print_tree(&dir, 0);
                    }
                }
                Err(ParseError::Cancelled) => {
                    eprintln!("Parse cancelled");
                    std::process::exit(130);
                }
                Err(e) => {
                    eprintln!("Parse failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

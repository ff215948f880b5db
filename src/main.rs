use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use semgraph_context::snapshot::{read_snapshot_dir, JsonSnapshotDecoder};
use semgraph_core::{OutputFormat, SemgraphConfig};
use semgraph_lens::encoder::Encoder;
use semgraph_lens::rag::GraphRag;
use semgraph_lens::search::NodeHit;

const CONFIG_FILE: &str = ".semgraph.toml";

#[derive(Parser)]
#[command(
    name = "semgraph",
    version,
    about = "Graph retrieval over semantic-graph snapshots",
    long_about = "Semgraph merges per-file semantic-graph snapshots into one knowledge graph,\n\
                   finds the nodes relevant to a question, and expands them into a compact\n\
                   context block for LLM prompts.\n\n\
                   Examples:\n  \
                     semgraph query 'how does the cache evict bitmaps'   Search, expand, render\n  \
                     semgraph search 'http fetcher' --limit 10           Ranked nodes only\n  \
                     semgraph context 'engine/LruCache#' --hops 2        Expand explicit ids\n  \
                     semgraph stats --project glide                      Graph statistics\n  \
                     semgraph init                                       Write .semgraph.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .semgraph.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project to load (overrides SEMGRAPH_PROJECT and default_project)
    #[arg(long, global = true, conflicts_with = "data_dir")]
    project: Option<String>,

    /// Project data directory, bypassing the configured projects
    #[arg(
        long,
        global = true,
        long_help = "Project data directory, bypassing the configured projects.\n\n\
                       Snapshots are read from <DATA_DIR>/<snapshots.dir_name>\n\
                       (default: <DATA_DIR>/.semanticgraphs)."
    )]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Plain-text context block (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output (info-level logs on stderr)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Find relevant nodes, expand their neighborhood, and render it
    #[command(long_about = "Find relevant nodes, expand their neighborhood, and render it.\n\n\
        Uses semantic search when an embedding provider is configured, keyword\n\
        matching otherwise. The hits seed a breadth-first expansion of --hops rounds.\n\n\
        Examples:\n  semgraph query 'bitmap pooling'\n  semgraph query 'decode pipeline' --limit 3 --hops 2")]
    Query {
        /// Natural-language question or keywords
        text: String,

        /// Number of seed nodes (default: context.limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Expansion rounds (default: context.hops)
        #[arg(long)]
        hops: Option<usize>,
    },
    /// Rank nodes without expanding them
    Search {
        /// Natural-language question or keywords
        text: String,

        /// Maximum results to return (default: context.limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Expand explicit node ids and render the result
    #[command(long_about = "Expand explicit node ids and render the result.\n\n\
        Ids not present in the graph are ignored.\n\n\
        Example:\n  semgraph context 'engine/LruCache#' 'engine/BitmapPool#' --hops 1")]
    Context {
        /// Seed node ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Expansion rounds (default: context.hops)
        #[arg(long)]
        hops: Option<usize>,
    },
    /// Show node, edge, and kind statistics for the loaded graph
    Stats,
    /// Create a default .semgraph.toml configuration file
    #[command(long_about = "Create a default .semgraph.toml configuration file.\n\n\
        Generates a template with all available options.\n\
        Fails if .semgraph.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("semgraph v{version}: graph retrieval over semantic-graph snapshots\n");

    println!("Quick start:");
    println!("  semgraph init                 Create a .semgraph.toml config file");
    println!("  semgraph stats                Check that snapshots load");
    println!("  semgraph query 'your question'  Build a context block\n");

    println!("All commands:");
    println!("  query     Search, expand, and render context");
    println!("  search    Ranked nodes only");
    println!("  context   Expand explicit node ids");
    println!("  stats     Graph statistics");
    println!("  init      Create default configuration\n");

    println!("Run 'semgraph <command> --help' for details.");
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SemgraphConfig> {
    let config = match path {
        Some(path) => SemgraphConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                SemgraphConfig::from_file(default_path)?
            } else {
                SemgraphConfig::default()
            }
        }
    };
    Ok(config)
}

fn snapshot_dir(cli: &Cli, config: &SemgraphConfig) -> Result<PathBuf> {
    if let Some(data_dir) = &cli.data_dir {
        return Ok(data_dir.join(&config.snapshots.dir_name));
    }
    let project = config.resolve_project(cli.project.as_deref())?;
    tracing::info!("project '{}' at {}", project.name, project.data_dir.display());
    Ok(project.snapshot_dir)
}

fn build_encoder(config: &SemgraphConfig) -> Encoder {
    match Encoder::from_config(&config.embedding) {
        Ok(encoder) => encoder,
        Err(e) => {
            warn!("{e}; using keyword search");
            Encoder::Disabled
        }
    }
}

fn spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn build_engine(cli: &Cli, config: &SemgraphConfig) -> Result<GraphRag> {
    let dir = snapshot_dir(cli, config)?;
    let reader = read_snapshot_dir(&dir, &config.snapshots.extension, &JsonSnapshotDecoder)?;
    let encoder = build_encoder(config);

    let spinner = spinner("Loading snapshots...");
    let rag = GraphRag::from_snapshots(reader, encoder);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    tracing::info!("{} search over {} nodes", rag.mode(), rag.graph().node_count());
    Ok(rag)
}

fn print_hits(hits: &[NodeHit], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hits).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("| Score | Kind | Name | ID |");
            println!("|-------|------|------|----|");
            for hit in hits {
                println!(
                    "| {:.3} | {} | {} | `{}` |",
                    hit.score,
                    hit.node.kind,
                    hit.node.label(),
                    hit.node.id
                );
            }
        }
        OutputFormat::Text => {
            if hits.is_empty() {
                println!("No matching nodes.");
            }
            for (i, hit) in hits.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} {} ({})",
                    i + 1,
                    hit.score,
                    hit.node.kind,
                    hit.node.label(),
                    hit.node.id
                );
            }
        }
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Semgraph Configuration

# Project used when neither --project nor SEMGRAPH_PROJECT is given
# default_project = "glide"

# [projects.glide]
# data_dir = "data/glide"
# code_dir = "code/glide-4.5.0"

[snapshots]
# dir_name = ".semanticgraphs"
# extension = "json"

[embedding]
# "none" uses keyword search; "openai" targets any OpenAI-compatible endpoint
# provider = "none"
# model = "text-embedding-3-small"
# api_key = "..."  # falls back to OPENAI_API_KEY
# base_url = "https://api.openai.com/v1"
# batch_size = 64

[context]
# limit = 5
# hops = 1
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        None => {
            print_welcome();
        }
        Some(Command::Query {
            ref text,
            limit,
            hops,
        }) => {
            let rag = build_engine(&cli, &config)?;
            let hits = rag.find(text, limit.unwrap_or(config.context.limit))?;
            let seeds: Vec<&str> = hits.iter().map(|h| h.node.id.as_str()).collect();
            let subgraph = rag.expand(&seeds, hops.unwrap_or(config.context.hops));
            print!("{}", rag.format(&subgraph, cli.format)?);
        }
        Some(Command::Search { ref text, limit }) => {
            let rag = build_engine(&cli, &config)?;
            let hits = rag.find(text, limit.unwrap_or(config.context.limit))?;
            print_hits(&hits, cli.format)?;
        }
        Some(Command::Context { ref ids, hops }) => {
            let rag = build_engine(&cli, &config)?;
            let subgraph = rag.expand(ids, hops.unwrap_or(config.context.hops));
            print!("{}", rag.format(&subgraph, cli.format)?);
        }
        Some(Command::Stats) => {
            let rag = build_engine(&cli, &config)?;
            let stats = rag.graph().stats();
            let report = rag.load_report();
            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "load": report,
                        "graph": stats,
                        "searchMode": rag.mode(),
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Graph Statistics\n");
                    println!("- **Snapshots:** {} loaded, {} skipped", report.files_loaded, report.files_skipped);
                    println!("- **Nodes:** {} ({} vertices)", stats.nodes, stats.vertices);
                    println!("- **Edges:** {}", stats.edges);
                    println!("- **Search:** {}", rag.mode());
                }
                OutputFormat::Text => {
                    println!(
                        "Snapshots: {} loaded, {} skipped",
                        report.files_loaded, report.files_skipped
                    );
                    print!("{stats}");
                    println!("Search: {}", rag.mode());
                }
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "semgraph", &mut std::io::stdout());
        }
    }

    Ok(())
}

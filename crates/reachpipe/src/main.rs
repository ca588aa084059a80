use anyhow::Result;
use clap::{Parser, Subcommand};
use reachpipe::{Config, Reach};

#[derive(Parser, Debug)]
#[command(name = "reachpipe")]
#[command(about = "Read and search any platform from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a URL; prints normalized content (auto-detects the platform).
    Read(ReadCmd),
    /// Search the web, or one platform with --adapter.
    Search(SearchCmd),
    /// Check which platform integrations are ready (grouped by setup tier).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ReadCmd {
    url: String,
    /// Output format. Allowed: text, json
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    query: String,
    /// Number of results.
    #[arg(long, default_value_t = 5)]
    limit: usize,
    /// Adapter to search with (default: exa, the semantic web search).
    #[arg(long)]
    adapter: Option<String>,
    /// Output format. Allowed: text, json
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format. Allowed: text, json
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format. Allowed: json, text
    #[arg(long, default_value = "json")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reach = Reach::with_config(Config::new());

    match cli.command {
        Commands::Read(args) => {
            let result = reach.read(&args.url).await?;
            match args.output.to_ascii_lowercase().as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&result)?),
                _ => {
                    println!("# {}", result.title);
                    if let Some(author) = &result.author {
                        println!("by {author}");
                    }
                    if let Some(date) = &result.date {
                        println!("{date}");
                    }
                    println!();
                    println!("{}", result.content);
                }
            }
        }
        Commands::Search(args) => {
            let hits = match args.adapter.as_deref() {
                Some(name) => reach.search_platform(name, &args.query, args.limit).await?,
                None => reach.search(&args.query, args.limit).await?,
            };
            match args.output.to_ascii_lowercase().as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&hits)?),
                _ => {
                    if hits.is_empty() {
                        println!("no results");
                    }
                    for (i, hit) in hits.iter().enumerate() {
                        println!("{}. {}", i + 1, hit.title);
                        println!("   {}", hit.url);
                        if !hit.snippet.is_empty() {
                            println!("   {}", hit.snippet);
                        }
                    }
                }
            }
        }
        Commands::Doctor(args) => {
            match args.output.to_ascii_lowercase().as_str() {
                "json" => {
                    let results = reach.doctor().await;
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                _ => println!("{}", reach.doctor_report().await),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "reachpipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("reachpipe {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use okapi_core::persist::IndexPaths;
use okapi_core::IndexReader;
use searcher::{answer_queries, build_app};
use std::io::{self, BufWriter};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Rank documents of a built index with Okapi BM25", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one query per stdin line and print ranked `docNo score` lines
    Query {
        /// Index directory path
        #[arg(long, default_value = ".")]
        index: String,
        /// Print at most this many hits per query
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Serve queries over HTTP
    Serve {
        /// Index directory path
        #[arg(long, default_value = ".")]
        index: String,
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { index, limit } => {
            let reader = IndexReader::open(&IndexPaths::new(&index))
                .with_context(|| format!("failed to load index from {index}"))?;
            let stdout = io::stdout();
            let answered = answer_queries(&reader, io::stdin().lock(), BufWriter::new(stdout.lock()), limit)?;
            tracing::info!(answered, "queries done");
            Ok(())
        }
        Commands::Serve { index, host, port } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(serve(index, host, port)),
    }
}

async fn serve(index: String, host: String, port: u16) -> Result<()> {
    let app: Router = build_app(index)?;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

//! Chunk an HTML document into token-budgeted pieces and print or save them.
//!
//! # Examples
//!
//! ```sh
//! # Chunk a saved page, 1000 tokens per chunk
//! shardom page.html --max-tokens 1000
//!
//! # Pipe from stdin, keep hidden content, write chunk files
//! curl -s https://example.com | shardom --stdin --max-tokens 500 \
//!   --no-clean --output-dir chunks/
//!
//! # JSON array output
//! shardom page.html --max-tokens 1000 --json
//! ```

use clap::Parser;
use shardom::{ChunkerConfig, HtmlChunker};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Split an HTML document into token-budgeted, self-contained chunks.
#[derive(Parser)]
#[command(name = "shardom")]
struct Cli {
    // ── Input ──────────────────────────────────────────────────
    /// HTML file to chunk (or use --stdin)
    file: Option<PathBuf>,

    /// Read the HTML document from stdin
    #[arg(long)]
    stdin: bool,

    // ── Budget ─────────────────────────────────────────────────
    /// Maximum tokens per chunk (cl100k_base tokenizer)
    #[arg(long)]
    max_tokens: usize,

    // ── Cleaning ───────────────────────────────────────────────
    /// Skip the hidden-content cleaning pre-pass
    #[arg(long)]
    no_clean: bool,

    /// Truncate long URL-ish attribute values to this many characters (0 disables)
    #[arg(long, default_value_t = 40)]
    attr_cutoff: usize,

    // ── Output ─────────────────────────────────────────────────
    /// Write chunk_N.html files into this directory instead of printing
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the chunks as a JSON array
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let html = if cli.stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buf
    } else if let Some(path) = &cli.file {
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?
    } else {
        return Err("provide an HTML file or --stdin".to_string());
    };

    let config = ChunkerConfig::new(cli.max_tokens)
        .with_cleaning(!cli.no_clean)
        .with_attr_cutoff(cli.attr_cutoff);
    let chunks = HtmlChunker::new(config)?.chunk(&html)?;

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir).map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
        for (i, chunk) in chunks.iter().enumerate() {
            let path = dir.join(format!("chunk_{i}.html"));
            fs::write(&path, chunk).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        }
        eprintln!("wrote {} chunks to {}", chunks.len(), dir.display());
    } else if cli.json {
        let out = serde_json::to_string_pretty(&chunks)
            .map_err(|e| format!("failed to serialize chunks: {e}"))?;
        println!("{out}");
    } else {
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                println!("<!-- ── chunk {i} ── -->");
            }
            println!("{chunk}");
        }
    }
    Ok(())
}

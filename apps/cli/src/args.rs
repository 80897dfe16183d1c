//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "depot")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Inspect and modify objects in a depot storage")]
pub struct Cli {
    /// Configuration file; `DEPOT__*` environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Storage locator (`gs://`, `s3://`, `file://`, `mem://` or a bare path), overrides `storage.url`
    #[arg(short, long, global = true)]
    pub url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List objects below a prefix
    Ls {
        #[arg(default_value = "")]
        prefix: String,
        /// Show sizes (stats every object)
        #[arg(short, long)]
        long: bool,
        /// Parallel stat calls, overrides `storage.walk.concurrency`
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },
    /// Print an object to stdout
    Cat { path: String },
    /// Store a file (or stdin) as an object
    Put {
        path: String,
        /// Source file; stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(long)]
        content_type: Option<String>,
        /// Metadata entry, repeatable
        #[arg(short, long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Delete an object
    Rm {
        path: String,
        /// Delete everything below the path
        #[arg(short, long)]
        recursive: bool,
    },
    /// Show object attributes
    Stat { path: String },
    /// Print a (signed) URL for an object
    Url {
        path: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Validity in seconds
        #[arg(short, long, default_value_t = 60)]
        expires: u64,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

//! Command-line interface definitions for SourceShield.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Global options can also be supplied through environment variables.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments for the SourceShield application.
///
/// # Examples
///
/// ```sh
/// # Start the dashboard on the configured address
/// sourceshield serve
///
/// # Analyze one article and export the report
/// sourceshield analyze --url https://example.com/story -j ./json
///
/// # Compare coverage from several outlets
/// sourceshield compare https://a.example/story https://b.example/story
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true, env = "SOURCESHIELD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the web dashboard and JSON API
    Serve {
        /// Address to listen on (defaults to server.bind from the config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Analyze a single article from a URL or pasted text
    Analyze {
        #[command(flatten)]
        input: AnalyzeInput,

        /// Output directory for the JSON report
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },

    /// Compare coverage of the same story across 2 to 5 sources
    Compare {
        /// URLs or article texts
        #[arg(required = true, num_args = 2..=5)]
        sources: Vec<String>,

        /// Output directory for the JSON report
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },

    /// Show recent analyses and trends
    History {
        /// Number of analyses to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct AnalyzeInput {
    /// Article URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Article text
    #[arg(short, long)]
    pub text: Option<String>,
}

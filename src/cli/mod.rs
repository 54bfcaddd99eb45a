//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the sonarmine binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::resolver::MissingRepoPolicy;

/// SonarCloud data harvester.
#[derive(Parser, Debug)]
#[command(name = "sonarmine", about = "Harvest data from SonarCloud", version)]
pub struct Cli {
    /// Print results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Directory that receives every written artifact.
    #[arg(long, global = true, env = "SONARMINE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enumerate and resolve every project of the configured languages.
    Harvest {
        /// JSON harvest configuration.
        #[arg(long, short)]
        config: PathBuf,
    },

    /// List the projects of one organization.
    Organization {
        /// Organization key.
        #[arg(long)]
        organization: String,

        /// Also resolve each project's repository.
        #[arg(long)]
        resolve_repos: bool,

        /// What to do with projects whose repository is unknown.
        #[arg(long, value_enum, default_value_t = MissingRepo::Keep)]
        missing_repo: MissingRepo,

        /// Concurrent repository lookups.
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Fetch every metric definition.
    Metrics,

    /// Assemble the measure history of one project.
    Measures {
        /// Project key.
        #[arg(long)]
        project: String,

        /// Metric ordering CSV (defaults to `<output-dir>/metrics/metrics.csv`).
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Fetch every issue of one project.
    Issues {
        /// Project key.
        #[arg(long)]
        project: String,

        /// Organization key.
        #[arg(long)]
        organization: Option<String>,
    },

    /// Count the projects of a language within an ncloc range.
    Count {
        /// Language key.
        #[arg(long)]
        language: String,

        /// Inclusive lower ncloc bound.
        #[arg(long, default_value_t = 0)]
        lower: u64,

        /// Exclusive upper ncloc bound; unbounded when absent.
        #[arg(long)]
        upper: Option<u64>,
    },
}

/// Handling of projects without a known repository.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingRepo {
    /// Keep them in the output without a repository.
    Keep,
    /// Leave them out of the output.
    Drop,
}

impl From<MissingRepo> for MissingRepoPolicy {
    fn from(value: MissingRepo) -> Self {
        match value {
            MissingRepo::Keep => MissingRepoPolicy::Keep,
            MissingRepo::Drop => MissingRepoPolicy::Drop,
        }
    }
}

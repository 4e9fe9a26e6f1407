//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Query a comic catalogue API and print the results as JSON.
#[derive(Parser, Debug)]
#[command(name = "comicapi")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/comicapi/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Netscape-format cookie file holding the login token
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show comic metadata and chapter groups
    Details {
        /// Comic path word
        comic: String,
    },

    /// List chapters of one group, or of every group
    Chapters {
        /// Comic path word
        comic: String,

        /// Group path word; all groups when omitted
        #[arg(short, long)]
        group: Option<String>,
    },

    /// List the ordered page URLs of a chapter
    Pages {
        /// Comic path word the chapter belongs to
        comic: String,

        /// Chapter UUID
        chapter: String,
    },
}

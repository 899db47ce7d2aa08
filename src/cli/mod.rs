// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the typeahead command-line interface.
//!
//! Four subcommands. `suggest` and `record` load a JSON corpus directory
//! (one `<project>.json` per project), build suggester data for it and then
//! complete a query or count a search. `popularity` and `inspect` read the
//! popularity files those runs leave behind in the data directory.

pub mod display;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "typeahead",
    about = "As-you-type query completion over per-project term dictionaries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the corpus and the suggester data live.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Directory of `<project>.json` files, each an array of field → text objects
    #[arg(long)]
    pub corpus: PathBuf,

    /// Directory for popularity files (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON suggester config
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// The query being typed.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Project to search; repeat for several
    #[arg(short, long = "project", required = true)]
    pub projects: Vec<String>,

    /// Field the query text belongs to
    #[arg(short, long, default_value = "full")]
    pub field: String,

    /// Query text of that field
    #[arg(short, long)]
    pub query: String,

    /// Text of another field, as FIELD=TEXT; repeat for several
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Complete the token under the caret
    Suggest {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Byte offset of the caret in the query (default: end of text)
        #[arg(long)]
        caret: Option<usize>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count an executed search toward term popularity
    Record {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// List the most searched terms of a project field
    Popularity {
        /// Directory holding popularity files
        #[arg(long)]
        data_dir: PathBuf,

        #[arg(short, long)]
        project: String,

        #[arg(short, long, default_value = "full")]
        field: String,

        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: usize,

        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect a popularity file
    Inspect {
        /// Path to a .pop file
        file: PathBuf,

        /// Number of top entries to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },
}

/// Parse `FIELD=TEXT`.
pub fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, text)) if !field.is_empty() => Ok((field.to_string(), text.to_string())),
        _ => Err(format!("expected FIELD=TEXT, got `{s}`")),
    }
}

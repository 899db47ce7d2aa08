// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::warn;

use typeahead::observability::init_logging;
use typeahead::popular::{decode_store, top_page, PopularityEntry};
use typeahead::suggester::popularity_path;
use typeahead::{parse_query, JsonCorpusSource, SuggestRequest, Suggester, SuggesterConfig};

mod cli;
use cli::display::*;
use cli::{Cli, Commands, CorpusArgs, QueryArgs};

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Suggest {
            corpus,
            query,
            caret,
            json,
        } => run_suggest(&corpus, query, caret, json),
        Commands::Record { corpus, query } => run_record(&corpus, query),
        Commands::Popularity {
            data_dir,
            project,
            field,
            page,
            page_size,
            json,
        } => run_popularity(&data_dir, &project, &field, page, page_size, json),
        Commands::Inspect { file, top } => run_inspect(&file, top),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

/// Load the corpus and wait for the initial build.
fn open_suggester(args: &CorpusArgs) -> Result<(Suggester, Duration), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SuggesterConfig::load(path)?,
        None => SuggesterConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    let wait = config.build_termination();

    let start = Instant::now();
    let source = Arc::new(JsonCorpusSource::load(args.corpus.clone())?);
    let suggester = Suggester::new(config, source)?;
    suggester.init();
    if !suggester.wait_for_init(wait) {
        warn!("timed out waiting for suggester data");
    }
    Ok((suggester, start.elapsed()))
}

fn query_fields(query: &QueryArgs) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = query.filters.iter().cloned().collect();
    fields.insert(query.field.clone(), query.query.clone());
    fields
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn run_suggest(corpus: &CorpusArgs, query: QueryArgs, caret: Option<usize>, json: bool) -> CliResult {
    let (suggester, build_time) = open_suggester(corpus)?;
    let request = SuggestRequest {
        fields: query_fields(&query),
        caret: caret.unwrap_or(query.query.len()),
        field: query.field,
        projects: query.projects,
    };
    let out = suggester.suggest(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    section_top("PROJECTS");
    for project in &request.projects {
        let state = suggester
            .project_state(project)
            .map_or_else(|| themed(GRAY, &[], "unknown"), |s| state_label(&s));
        row(&format!("  {} {}", pad_right(project, 24), state));
    }

    section_mid("SUGGESTIONS");
    if out.candidates.is_empty() {
        row(&themed(GRAY, &[], "  (none)"));
    }
    for (rank, candidate) in out.candidates.iter().enumerate() {
        row(&format!(
            "  {} {} {} {}  {}",
            pad_left(&(rank + 1).to_string(), 3),
            pad_right(&themed(CYAN, &[BOLD], &candidate.term), 28),
            pad_left(&candidate.doc_freq.to_string(), 7),
            pad_left(&count_value(candidate.popularity), 7),
            themed(GRAY, &[], &candidate.projects.join(", ")),
        ));
    }

    if !out.excluded.is_empty() {
        section_mid("EXCLUDED");
        for excluded in &out.excluded {
            row(&format!(
                "  {} {}",
                pad_right(&excluded.project, 24),
                exclusion_label(&excluded.reason)
            ));
        }
    }

    section_mid("TIMING");
    row(&format!("  build   {}", timing_ms(ms(build_time))));
    row(&format!("  suggest {}", timing_ms(ms(out.elapsed))));
    section_bot();
    Ok(())
}

fn run_record(corpus: &CorpusArgs, query: QueryArgs) -> CliResult {
    let (suggester, _) = open_suggester(corpus)?;
    let parsed = parse_query(&query_fields(&query))?;
    suggester.on_search(&query.projects, &parsed);
    if !suggester.wait_for_events(suggester.config().build_termination()) {
        warn!("timed out waiting for search events to apply");
    }
    suggester.close();

    section_top("RECORDED");
    for (field, term) in parsed.searched_terms() {
        row(&format!("  {} {}", pad_right(&field, 16), themed(CYAN, &[], &term)));
    }
    section_bot();
    Ok(())
}

fn read_entries(path: &Path) -> Result<(usize, typeahead::popular::DecodedStore), Box<dyn Error>> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let decoded = decode_store(&bytes)?;
    Ok((bytes.len(), decoded))
}

fn print_entries(entries: &[PopularityEntry]) {
    for entry in entries {
        row(&format!(
            "  {} {}",
            pad_right(&entry.term, 40),
            pad_left(&count_value(entry.count), 10)
        ));
    }
}

fn run_popularity(
    data_dir: &Path,
    project: &str,
    field: &str,
    page: usize,
    page_size: usize,
    json: bool,
) -> CliResult {
    let path = popularity_path(data_dir, project, field);
    if !path.exists() {
        return Err(format!("no popularity data for {project}/{field}").into());
    }
    let (_, decoded) = read_entries(&path)?;
    let entries = top_page(
        decoded.entries.iter().map(|(k, v)| (k.as_str(), *v)),
        page,
        page_size,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    section_top(&format!("POPULARITY {project}/{field} (page {page})"));
    print_entries(&entries);
    section_bot();
    Ok(())
}

fn run_inspect(file: &Path, top: usize) -> CliResult {
    let (size, decoded) = read_entries(file)?;
    let total: u64 = decoded.entries.iter().map(|(_, n)| *n).sum();

    section_top("HEADER");
    row(&format!("  file       {}", file.display()));
    row(&format!("  size       {}", format_size(size)));
    row(&format!("  version    {}", decoded.header.version));
    row(&format!("  capacity   {}", decoded.header.capacity));
    row(&format!("  entries    {}", decoded.header.count));
    row(&format!("  searches   {}", total));
    section_mid(&format!("TOP {top}"));
    print_entries(&top_page(
        decoded.entries.iter().map(|(k, v)| (k.as_str(), *v)),
        0,
        top,
    ));
    section_bot();
    Ok(())
}

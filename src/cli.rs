// src/cli.rs
use std::path::PathBuf;

use crate::config::{RunOptions, Source, SourceSelector};
use crate::core::net::HttpTransport;
use crate::error::{Error, Result};
use crate::progress::ConsoleProgress;
use crate::runner::{self, RunSummary};

pub const HELP: &str = include_str!("cli_help.txt");

pub enum Command {
    Run(RunOptions),
    Help,
}

/// Environment first, then flags on top.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    parse_args_over(RunOptions::from_env(), args)
}

pub fn parse_args_over(mut opts: RunOptions, args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut args = args.into_iter();
    while let Some(a) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| Error::config(format!("missing value for {flag}")));
        match a.as_str() {
            "-s" | "--source" => opts.sources = parse_sources(&value("--source")?)?,
            "-d" | "--data-dir" => opts.data_dir = PathBuf::from(value("--data-dir")?),
            "-n" | "--top" => opts.top_k = parse_top(&value("--top")?)?,
            "--preview" => {
                let v = value("--preview")?;
                opts.preview = v.parse().map_err(|_| Error::config(format!("bad --preview value: {v}")))?;
            }
            "--snapshots" => opts.write_snapshots = true,
            "--log" => opts.log_file = Some(PathBuf::from(value("--log")?)),
            "--rank-only" => opts.rank_only = true,
            "-h" | "--help" => return Ok(Command::Help),
            _ => return Err(Error::config(format!("unknown arg: {a}"))),
        }
    }
    Ok(Command::Run(opts))
}

fn parse_sources(v: &str) -> Result<SourceSelector> {
    if v.trim().eq_ignore_ascii_case("all") {
        return Ok(SourceSelector::All);
    }
    let mut out = Vec::new();
    for part in v.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let s = Source::parse(part).ok_or_else(|| Error::config(format!("unknown source: {part}")))?;
        out.push(s);
    }
    if out.is_empty() {
        return Err(Error::config("--source needs at least one source"));
    }
    Ok(SourceSelector::Only(out))
}

fn parse_top(v: &str) -> Result<Option<usize>> {
    if v.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match v.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(Error::config(format!("bad --top value: {v}"))),
        Ok(n) => Ok(Some(n)),
    }
}

/// One run with console progress; previews each feed's ranking on stdout.
pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    let log_path = opts.log_path();
    crate::log::init(&log_path);
    logf!("CLI: start sources={:?} data_dir={} rank_only={}", opts.sources(), opts.data_dir.display(), opts.rank_only);

    let mut progress = ConsoleProgress::new();
    let summary = if opts.rank_only {
        runner::rank_only(opts, &mut progress)?
    } else {
        runner::run(opts, &HttpTransport::new(), &mut progress)?
    };
    print_summary(&summary, opts.preview);
    Ok(summary)
}

pub fn print_summary(summary: &RunSummary, preview: usize) {
    for f in &summary.feeds {
        if f.skipped() && f.ranking.column.is_none() {
            println!("== {}: nothing collected this run", f.feed);
            continue;
        }
        let column = f.ranking.column.as_deref().unwrap_or("-");
        println!("== {} @ {} ({} rows)", f.feed, column, f.ranking.rows.len());
        for line in f.ranking.preview(preview) {
            println!("{line}");
        }
    }
    for p in &summary.archived {
        println!("snapshot: {}", p.display());
    }
}

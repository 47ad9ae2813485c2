// src/runner.rs
//
// One batch run: fetch every planned listing, then per feed
// normalize -> load -> merge -> persist -> rank.
//
// All fetching happens before the first write. A transport failure therefore
// aborts the run with the store untouched; once writing starts, the only
// failures left are write failures, and those are returned to the caller.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::archive;
use crate::config::RunOptions;
use crate::core::net::Transport;
use crate::error::Result;
use crate::feeds::{self, Feed};
use crate::fetch::Fetcher;
use crate::normalize::{NormalizeReport, Record, normalize};
use crate::progress::Progress;
use crate::ranking::{Ranking, rank};
use crate::roster::{Roster, RosterUpdate};
use crate::store::{LoadReport, MatrixStore, MergeReport};

#[derive(Clone, Debug, Default)]
pub struct FeedOutcome {
    pub feed: String,
    pub dir: PathBuf,
    /// `None` when the snapshot was empty and nothing was merged.
    pub merge: Option<MergeReport>,
    pub normalize: NormalizeReport,
    pub load: LoadReport,
    pub roster: RosterUpdate,
    pub ranking: Ranking,
}

impl FeedOutcome {
    pub fn skipped(&self) -> bool {
        self.merge.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub captured_at: Option<DateTime<Utc>>,
    pub feeds: Vec<FeedOutcome>,
    pub archived: Vec<PathBuf>,
}

/// Collect now with the default fetch settings.
pub fn run<T: Transport + ?Sized>(opts: &RunOptions, transport: &T, progress: &mut dyn Progress) -> Result<RunSummary> {
    run_with(opts, &Fetcher::new(transport), Utc::now(), progress)
}

/// Collect with an explicit fetcher and capture instant.
pub fn run_with<T: Transport + ?Sized>(
    opts: &RunOptions,
    fetcher: &Fetcher<'_, T>,
    captured_at: DateTime<Utc>,
    progress: &mut dyn Progress,
) -> Result<RunSummary> {
    let jobs = feeds::plan(opts)?;
    let root = opts.data_dir.as_path();
    logf!("Run: begin, {} job(s), data_dir={}", jobs.len(), root.display());
    progress.begin(jobs.iter().map(|j| j.feeds.len()).sum());

    let mut fetched: Vec<Vec<Record>> = Vec::with_capacity(jobs.len());
    for job in &jobs {
        progress.log(&format!("fetching {}", job.label));
        match fetcher.collect(job.spec.as_ref(), progress) {
            Ok(records) => fetched.push(records),
            Err(e) => {
                loge!("Run: {} failed, nothing written: {e}", job.label);
                progress.finish();
                return Err(e);
            }
        }
    }

    let mut summary = RunSummary { captured_at: Some(captured_at), ..Default::default() };

    if opts.write_snapshots {
        for (job, records) in jobs.iter().zip(&fetched) {
            match archive::write_snapshot(&root.join(&job.archive_dir), records, captured_at) {
                Ok(path) => summary.archived.push(path),
                Err(e) => logw!("Run: snapshot for {} not written: {e}", job.label),
            }
        }
    }

    for (job, records) in jobs.iter().zip(&fetched) {
        for feed in &job.feeds {
            let outcome = collect_feed(root, feed, records, captured_at, opts.top_k);
            let outcome = match outcome {
                Ok(o) => o,
                Err(e) => {
                    progress.finish();
                    return Err(e);
                }
            };
            progress.feed_done(&feed.id);
            summary.feeds.push(outcome);
        }
    }

    logf!("Run: done, {} feed(s)", summary.feeds.len());
    progress.finish();
    Ok(summary)
}

fn collect_feed(
    root: &Path,
    feed: &Feed,
    records: &[Record],
    captured_at: DateTime<Utc>,
    top_k: Option<usize>,
) -> Result<FeedOutcome> {
    let (snapshot, report) = normalize(feed, records, captured_at);
    if report.degraded() > 0 {
        logw!("Run: {} normalize absorbed {} problem(s): {report:?}", feed.id, report.degraded());
    }
    let mut outcome = FeedOutcome { feed: feed.id.clone(), dir: root.join(&feed.dir), normalize: report, ..Default::default() };
    if snapshot.is_empty() {
        logf!("Run: {} empty snapshot; store left as is", feed.id);
        return Ok(outcome);
    }

    let storage = feed.storage(root);
    let store = MatrixStore::new(&storage, feed.schema().clone());
    let (matrix, mut load) = store.load();
    let (mut roster, mut roster_reset) = Roster::load(&storage, feed.schema().clone());

    let (matrix, merge) = store.merge_with_report(matrix, &snapshot);
    outcome.roster = roster.update(&snapshot);

    // matrix first: a failed roster write leaves it one column ahead until
    // the next run in the same hour rewrites both
    store.recover(&mut load)?;
    store.persist(&matrix)?;
    Roster::recover(&storage, &mut roster_reset)?;
    roster.persist(&storage)?;

    let ranking = rank(&matrix, &roster, top_k);
    ranking.export(&storage)?;

    outcome.merge = Some(merge);
    outcome.load = load;
    outcome.ranking = ranking;
    Ok(outcome)
}

/// Rebuild rankings from what is on disk; nothing is fetched or merged.
pub fn rank_only(opts: &RunOptions, progress: &mut dyn Progress) -> Result<RunSummary> {
    let root = opts.data_dir.as_path();
    let present: Vec<Feed> = feeds::all(opts).into_iter().filter(|f| f.exists(root)).collect();
    progress.begin(present.len());

    let mut summary = RunSummary::default();
    for feed in &present {
        let storage = feed.storage(root);
        let (matrix, load) = MatrixStore::new(&storage, feed.schema().clone()).load();
        let (roster, _) = Roster::load(&storage, feed.schema().clone());
        let ranking = rank(&matrix, &roster, opts.top_k);
        ranking.export(&storage)?;
        progress.feed_done(&feed.id);
        summary.feeds.push(FeedOutcome {
            feed: feed.id.clone(),
            dir: root.join(&feed.dir),
            load,
            ranking,
            ..Default::default()
        });
    }
    logf!("Run: rank-only, {} feed(s)", summary.feeds.len());
    progress.finish();
    Ok(summary)
}

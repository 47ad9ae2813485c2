// src/feeds.rs
//
// Feed catalogue. A feed is one matrix + roster pair on disk, fed by one
// listing source through an extraction strategy. Several feeds may share a
// source (the CHZZK live list feeds three tables).
//
// Layout under the data root:
//   soop/categories/                      category viewers
//   soop/details/<cate_no>_<slug>/        streamer viewers inside one category
//   chzzk/categories/                     summed viewers per category
//   chzzk/game_categories/                same, GAME categories only
//   chzzk/channels/                       top channels by viewers
// Raw snapshots (when enabled) live in a `snapshots/` folder beside them.

use std::path::{Path, PathBuf};

use crate::config::consts::{CHZZK_TOP_CHANNELS, MATRIX_FILE, SNAPSHOT_DIR};
use crate::config::{RunOptions, Source, SourceSelector};
use crate::core::sanitize::slug;
use crate::core::{KeyField, KeySchema};
use crate::error::{Error, Result};
use crate::normalize::{Extractor, FieldExtractor, Record, Rollup};
use crate::specs::{ChzzkLives, ListingSpec, SoopCategoryContents, SoopCategoryList};
use crate::store::FileStorage;

use serde_json::Value;

const CHZZK_CATEGORY_KEY: [KeyField; 3] = [
    KeyField::text("categoryType"),
    KeyField::text("categoryId").with_aliases(&["liveCategory"]),
    KeyField::text("categoryValue").with_aliases(&["liveCategoryValue"]),
];

#[derive(Clone, Debug)]
pub struct Feed {
    pub id: String,
    pub source: Source,
    /// Relative to the data root.
    pub dir: PathBuf,
    pub extractor: FieldExtractor,
}

impl Feed {
    pub fn storage(&self, root: &Path) -> FileStorage {
        FileStorage::new(root.join(&self.dir))
    }

    pub fn schema(&self) -> &KeySchema {
        &self.extractor.schema
    }

    /// Whether a matrix for this feed already exists under `root`.
    pub fn exists(&self, root: &Path) -> bool {
        root.join(&self.dir).join(MATRIX_FILE).is_file()
    }
}

impl Extractor for Feed {
    fn key_schema(&self) -> &KeySchema {
        self.extractor.key_schema()
    }

    fn metric<'r>(&self, rec: &'r Record) -> Option<&'r Value> {
        self.extractor.metric(rec)
    }

    fn name(&self, rec: &Record) -> Option<String> {
        self.extractor.name(rec)
    }

    fn keep(&self, rec: &Record) -> bool {
        self.extractor.keep(rec)
    }

    fn rollup(&self) -> Rollup {
        self.extractor.rollup()
    }

    fn top_n(&self) -> Option<usize> {
        self.extractor.top_n()
    }
}

/* ---------------- Catalogue ---------------- */

pub fn soop_categories() -> Feed {
    let schema = KeySchema::new(vec![KeyField::numeric("category_no", 8)])
        .ignoring(&["category_name", "fixed_tags", "cate_img", "platform", "captured_at_utc"]);
    Feed {
        id: s!("soop-categories"),
        source: Source::SoopCategories,
        dir: PathBuf::from("soop").join("categories"),
        extractor: FieldExtractor::new(schema, &["view_cnt"], &["category_name"]),
    }
}

pub fn soop_details(cate_no: &str, name: &str) -> Feed {
    let schema = KeySchema::new(vec![KeyField::text("user_id")])
        .ignoring(&["user_nick", "broad_no", "broad_title", "category_no"]);
    Feed {
        id: format!("soop-details:{cate_no}"),
        source: Source::SoopDetails,
        dir: PathBuf::from("soop")
            .join("details")
            .join(format!("{cate_no}_{}", slug(name, "category"))),
        extractor: FieldExtractor::new(schema, &["view_cnt"], &["user_nick"]),
    }
}

fn chzzk_category_extractor() -> FieldExtractor {
    let mut ex = FieldExtractor::new(
        KeySchema::new(CHZZK_CATEGORY_KEY.to_vec()),
        &["concurrentUserCount"],
        &["categoryValue", "liveCategoryValue"],
    );
    ex.rollup = Rollup::Sum;
    ex
}

pub fn chzzk_categories() -> Feed {
    Feed {
        id: s!("chzzk-categories"),
        source: Source::Chzzk,
        dir: PathBuf::from("chzzk").join("categories"),
        extractor: chzzk_category_extractor(),
    }
}

pub fn chzzk_game_categories() -> Feed {
    let mut extractor = chzzk_category_extractor();
    extractor.only = Some(("categoryType", "GAME"));
    Feed {
        id: s!("chzzk-game-categories"),
        source: Source::Chzzk,
        dir: PathBuf::from("chzzk").join("game_categories"),
        extractor,
    }
}

pub fn chzzk_channels() -> Feed {
    let mut extractor = FieldExtractor::new(
        KeySchema::new(vec![KeyField::text("channelId")]).ignoring(&["channelName"]),
        &["concurrentUserCount"],
        &["channelName"],
    );
    extractor.top_n = Some(CHZZK_TOP_CHANNELS);
    Feed {
        id: s!("chzzk-channels"),
        source: Source::Chzzk,
        dir: PathBuf::from("chzzk").join("channels"),
        extractor,
    }
}

/// Every feed of the selected sources, credentials or not.
pub fn all(opts: &RunOptions) -> Vec<Feed> {
    let mut out = Vec::new();
    for source in opts.sources() {
        match source {
            Source::SoopCategories => out.push(soop_categories()),
            Source::SoopDetails => {
                out.extend(opts.soop_details.iter().map(|(no, name)| soop_details(no, name)));
            }
            Source::Chzzk => out.extend([chzzk_categories(), chzzk_game_categories(), chzzk_channels()]),
        }
    }
    out
}

/* ---------------- Fetch plan ---------------- */

/// One listing fetch and the feeds built from its records.
pub struct Job {
    pub label: String,
    pub spec: Box<dyn ListingSpec>,
    pub feeds: Vec<Feed>,
    /// Raw snapshot folder, relative to the data root.
    pub archive_dir: PathBuf,
}

/// Build the fetch jobs for a run.
///
/// CHZZK needs credentials. Asked for explicitly, their absence is a config
/// error; under the default "all sources" selection it is skipped with a warning.
pub fn plan(opts: &RunOptions) -> Result<Vec<Job>> {
    let explicit = matches!(opts.sources, SourceSelector::Only(_));
    let mut jobs = Vec::new();
    for source in opts.sources() {
        match source {
            Source::SoopCategories => {
                let feed = soop_categories();
                jobs.push(Job {
                    label: feed.id.clone(),
                    spec: Box::new(SoopCategoryList),
                    archive_dir: feed.dir.join(SNAPSHOT_DIR),
                    feeds: vec![feed],
                });
            }
            Source::SoopDetails => {
                for (no, name) in &opts.soop_details {
                    let feed = soop_details(no, name);
                    jobs.push(Job {
                        label: feed.id.clone(),
                        spec: Box::new(SoopCategoryContents::new(no.clone())),
                        archive_dir: feed.dir.join(SNAPSHOT_DIR),
                        feeds: vec![feed],
                    });
                }
            }
            Source::Chzzk => match &opts.chzzk {
                Some(creds) => jobs.push(Job {
                    label: s!("chzzk"),
                    spec: Box::new(ChzzkLives::new(creds.clone())),
                    feeds: vec![chzzk_categories(), chzzk_game_categories(), chzzk_channels()],
                    archive_dir: PathBuf::from("chzzk").join(SNAPSHOT_DIR),
                }),
                None if explicit => {
                    return Err(Error::config("CHZZK_CLIENT_ID and CHZZK_CLIENT_SECRET must be set for --source chzzk"));
                }
                None => logw!("Plan: CHZZK credentials not set; skipping chzzk"),
            },
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    #[test]
    fn detail_dirs_are_slugged() {
        let f = soop_details("00810000", "FC 온라인");
        assert_eq!(f.dir, PathBuf::from("soop/details/00810000_FC온라인"));
        assert_eq!(f.id, "soop-details:00810000");
    }

    #[test]
    fn default_plan_skips_chzzk_without_credentials() {
        let jobs = plan(&RunOptions::default()).unwrap();
        let labels: Vec<&str> = jobs.iter().map(|j| j.label.as_str()).collect();
        assert_eq!(labels, vec!["soop-categories", "soop-details:00040070", "soop-details:00810000"]);
    }

    #[test]
    fn explicit_chzzk_without_credentials_is_config_error() {
        let opts = RunOptions { sources: SourceSelector::Only(vec![Source::Chzzk]), ..RunOptions::default() };
        assert!(matches!(plan(&opts), Err(Error::Config(_))));
    }

    #[test]
    fn chzzk_job_feeds_three_tables() {
        let opts = RunOptions {
            sources: SourceSelector::Only(vec![Source::Chzzk]),
            chzzk: Some(Credentials { client_id: s!("a"), client_secret: s!("b") }),
            ..RunOptions::default()
        };
        let jobs = plan(&opts).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].feeds.len(), 3);
        assert_eq!(all(&opts).len(), 3);
    }
}

// src/config/options.rs
use std::fmt;
use std::path::PathBuf;

use super::consts::*;

/// A listing endpoint family. One fetch per source per run; several feeds may
/// be derived from one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    SoopCategories,
    SoopDetails,
    Chzzk,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::SoopCategories, Source::SoopDetails, Source::Chzzk];

    pub fn name(&self) -> &'static str {
        match self {
            Source::SoopCategories => "soop-categories",
            Source::SoopDetails => "soop-details",
            Source::Chzzk => "chzzk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soop-categories" | "soop" | "categories" => Some(Source::SoopCategories),
            "soop-details" | "details" => Some(Source::SoopDetails),
            "chzzk" => Some(Source::Chzzk),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSelector {
    All,
    Only(Vec<Source>),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

// Never print the secret.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub sources: SourceSelector,
    pub data_dir: PathBuf,
    /// Rows kept in each `top_latest.csv`; `None` keeps all.
    pub top_k: Option<usize>,
    /// Rows echoed to the console per feed.
    pub preview: usize,
    pub write_snapshots: bool,
    /// Skip fetching; rebuild rankings from what is on disk.
    pub rank_only: bool,
    pub log_file: Option<PathBuf>,
    pub chzzk: Option<Credentials>,
    /// `(cate_no, display name)` pairs whose live listings are tracked.
    pub soop_details: Vec<(String, String)>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sources: SourceSelector::All,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            top_k: None,
            preview: DEFAULT_PREVIEW,
            write_snapshots: false,
            rank_only: false,
            log_file: None,
            chzzk: None,
            soop_details: SOOP_TRACKED_CATEGORIES
                .iter()
                .map(|(no, name)| (s!(*no), s!(*name)))
                .collect(),
        }
    }
}

impl RunOptions {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        opts.apply_env(|k| std::env::var(k).ok());
        opts
    }

    /// Overlay values from an environment-like lookup.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let id = get(ENV_CHZZK_CLIENT_ID).filter(|v| !v.trim().is_empty());
        let secret = get(ENV_CHZZK_CLIENT_SECRET).filter(|v| !v.trim().is_empty());
        if let (Some(client_id), Some(client_secret)) = (id, secret) {
            self.chzzk = Some(Credentials { client_id, client_secret });
        }
        if let Some(v) = get(ENV_WRITE_SNAPSHOTS) {
            self.write_snapshots = v.trim().eq_ignore_ascii_case("true");
        }
    }

    pub fn sources(&self) -> Vec<Source> {
        match &self.sources {
            SourceSelector::All => Source::ALL.to_vec(),
            SourceSelector::Only(v) => {
                let mut v = v.clone();
                v.sort();
                v.dedup();
                v
            }
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| self.data_dir.join(LOG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (s!(*k), s!(*v))).collect()
    }

    #[test]
    fn credentials_need_both_halves() {
        let vars = env(&[(ENV_CHZZK_CLIENT_ID, "id")]);
        let mut o = RunOptions::default();
        o.apply_env(|k| vars.get(k).cloned());
        assert!(o.chzzk.is_none());

        let vars = env(&[(ENV_CHZZK_CLIENT_ID, "id"), (ENV_CHZZK_CLIENT_SECRET, "sec")]);
        o.apply_env(|k| vars.get(k).cloned());
        let c = o.chzzk.clone().unwrap();
        assert_eq!(c.client_id, "id");
        assert!(!format!("{c:?}").contains("sec"));
    }

    #[test]
    fn snapshot_toggle_reads_true_only() {
        let mut o = RunOptions::default();
        let vars = env(&[(ENV_WRITE_SNAPSHOTS, "TRUE")]);
        o.apply_env(|k| vars.get(k).cloned());
        assert!(o.write_snapshots);
        let vars = env(&[(ENV_WRITE_SNAPSHOTS, "yes")]);
        o.apply_env(|k| vars.get(k).cloned());
        assert!(!o.write_snapshots);
    }

    #[test]
    fn selected_sources_are_deduplicated_in_order() {
        let o = RunOptions {
            sources: SourceSelector::Only(vec![Source::Chzzk, Source::SoopCategories, Source::Chzzk]),
            ..RunOptions::default()
        };
        assert_eq!(o.sources(), vec![Source::SoopCategories, Source::Chzzk]);
    }
}

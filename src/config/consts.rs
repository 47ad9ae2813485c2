// src/config/consts.rs

// Net
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ranksnap/0.3)";
pub const FETCH_ATTEMPTS: u32 = 5;
pub const BACKOFF_INITIAL_MS: u64 = 1_000;
pub const BACKOFF_CAP_MS: u64 = 10_000;
pub const MAX_PAGES: u32 = 500; // hard stop if a listing never says "no more"

// SOOP
pub const SOOP_API: &str = "https://sch.sooplive.co.kr/api.php";
pub const SOOP_REFERER: &str = "https://www.sooplive.co.kr/";
pub const SOOP_TIMEOUT_SECS: u64 = 15;
pub const SOOP_CATEGORY_PAGE_SIZE: u32 = 120;
pub const SOOP_CATEGORY_PAUSE_MS: u64 = 350;
pub const SOOP_CONTENTS_PAGE_SIZE: u32 = 60;
pub const SOOP_CONTENTS_PAUSE_MS: u64 = 250;
pub const SOOP_TRACKED_CATEGORIES: &[(&str, &str)] = &[
    ("00040070", "버추얼"),
    ("00810000", "FC온라인"),
];

// CHZZK
pub const CHZZK_API: &str = "https://openapi.chzzk.naver.com/open/v1/lives";
pub const CHZZK_TIMEOUT_SECS: u64 = 20;
pub const CHZZK_PAGE_SIZE: u32 = 20;
pub const CHZZK_PAUSE_MS: u64 = 250;
pub const CHZZK_TOP_CHANNELS: usize = 100;

// Environment
pub const ENV_CHZZK_CLIENT_ID: &str = "CHZZK_CLIENT_ID";
pub const ENV_CHZZK_CLIENT_SECRET: &str = "CHZZK_CLIENT_SECRET";
pub const ENV_WRITE_SNAPSHOTS: &str = "WRITE_LIVE_SNAPSHOTS";

// Local store
pub const DEFAULT_DATA_DIR: &str = "data";
pub const TABLE_SEP: char = ',';
pub const WRITE_BOM: bool = true;
pub const MATRIX_FILE: &str = "matrix.csv";
pub const ROSTER_FILE: &str = "roster.csv";
pub const RANKING_FILE: &str = "top_latest.csv";
pub const SNAPSHOT_DIR: &str = "snapshots";
pub const LOG_FILE: &str = "ranksnap.log";

// Output
pub const DEFAULT_PREVIEW: usize = 25;

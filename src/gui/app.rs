// src/gui/app.rs
use std::{
    error::Error,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
    time::Duration,
};

use eframe::egui;

use crate::{
    config::state::ViewerState,
    core::net::HttpTransport,
    feeds::{self, Feed},
    ranking::{Ranking, rank},
    roster::Roster,
    runner::{self, RunSummary},
    store::{LoadReport, MatrixStore},
};

use super::{
    components::{action_bar, feed_panel, ranking_table},
    progress::GuiProgress,
};

pub fn run(options: eframe::NativeOptions) -> Result<(), Box<dyn Error>> {
    eframe::run_native(
        "ranksnap viewer",
        options,
        Box::new(|_cc| Ok(Box::new(App::new(ViewerState::default())))),
    )?;
    Ok(())
}

/// What the table shows for the selected feed.
pub struct FeedView {
    pub ranking: Ranking,
    pub load: LoadReport,
    pub rows: usize,
    pub columns: usize,
}

pub struct App {
    pub state: ViewerState,
    pub feeds: Vec<Feed>,
    pub view: Option<FeedView>,

    // status/progress (the worker writes here)
    pub status: Arc<Mutex<String>>,
    pub worker: Option<Receiver<crate::error::Result<RunSummary>>>,
}

impl App {
    pub fn new(state: ViewerState) -> Self {
        let feeds = feeds::all(&state.options);
        logf!("Init: viewer with {} feed(s) under {}", feeds.len(), state.options.data_dir.display());
        let mut app = Self {
            state,
            feeds,
            view: None,
            status: Arc::new(Mutex::new(s!("Idle"))),
            worker: None,
        };
        app.reload();
        app
    }

    /* ---------- tiny helpers ---------- */

    pub fn running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn current_feed(&self) -> Option<&Feed> {
        self.feeds.get(self.state.gui.selected_feed)
    }

    pub fn select(&mut self, idx: usize) {
        if idx != self.state.gui.selected_feed {
            logf!("UI: feed {} -> {}", self.state.gui.selected_feed, idx);
            self.state.gui.selected_feed = idx;
            self.reload();
        }
    }

    pub fn status(&self, msg: impl Into<String>) {
        if let Ok(mut s) = self.status.lock() {
            *s = msg.into();
        }
    }

    pub fn status_text(&self) -> String {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Re-read the selected feed's tables from disk.
    pub fn reload(&mut self) {
        let root = self.state.options.data_dir.clone();
        let Some(feed) = self.current_feed() else {
            self.view = None;
            return;
        };
        if !feed.exists(&root) {
            let id = feed.id.clone();
            self.view = None;
            self.status(format!("{id}: no data yet"));
            return;
        }
        let storage = feed.storage(&root);
        let (matrix, load) = MatrixStore::new(&storage, feed.schema().clone()).load();
        let (roster, _) = Roster::load(&storage, feed.schema().clone());
        let ranking = rank(&matrix, &roster, self.state.gui.top_k);
        let msg = format!("{}: {} rows x {} columns", feed.id, matrix.row_count(), matrix.column_count());
        self.view = Some(FeedView { ranking, load, rows: matrix.row_count(), columns: matrix.column_count() });
        self.status(msg);
    }

    /// One collection run on a worker thread; the UI polls for the result.
    pub fn start_run(&mut self) {
        if self.running() {
            return;
        }
        let opts = self.state.options.clone();
        let status = self.status.clone();
        let (tx, rx) = mpsc::channel();
        logf!("Run: requested from viewer");
        self.status("Collecting...");
        thread::spawn(move || {
            let mut progress = GuiProgress::new(status);
            let result = runner::run(&opts, &HttpTransport::new(), &mut progress);
            let _ = tx.send(result);
        });
        self.worker = Some(rx);
    }

    fn poll_worker(&mut self) {
        let Some(rx) = &self.worker else { return };
        match rx.try_recv() {
            Ok(Ok(summary)) => {
                self.worker = None;
                logf!("Run: viewer run merged {} feed(s)", summary.feeds.len());
                self.reload();
                self.status(format!("Collected {} feed(s)", summary.feeds.len()));
            }
            Ok(Err(e)) => {
                self.worker = None;
                loge!("Run: viewer run failed: {e}");
                self.status(format!("Error: {e}"));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.worker = None;
                self.status("Run stopped unexpectedly");
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_worker();
        if self.running() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::TopBottomPanel::top("actions").show(ctx, |ui| action_bar::draw(ui, self));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.status_text());
        });

        egui::SidePanel::left("feeds")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| feed_panel::draw(ui, self));

        egui::CentralPanel::default().show(ctx, |ui| ranking_table::draw(ui, self));
    }
}

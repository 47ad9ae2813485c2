// src/progress.rs
/// Progress reporting for a collection run.
/// Frontends (CLI/GUI) implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the number of feeds to process.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// One feed has been merged and persisted (or skipped).
    fn feed_done(&mut self, _feed: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Prints status lines to stderr.
pub struct ConsoleProgress {
    total: usize,
    done: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self { total: 0, done: 0 }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
    }

    fn log(&mut self, msg: &str) {
        eprintln!("  {msg}");
    }

    fn feed_done(&mut self, feed: &str) {
        self.done += 1;
        eprintln!("[{}/{}] {feed}", self.done, self.total);
    }
}

// src/config/state.rs
use super::options::RunOptions;

#[derive(Clone, Debug)]
pub struct GuiState {
    /// Index into the viewer's feed list
    pub selected_feed: usize,

    /// Rows shown in the table; `None` shows all
    pub top_k: Option<usize>,

    pub window_w: u32,
    pub window_h: u32,
}

impl Default for GuiState {
    fn default() -> Self {
        Self {
            selected_feed: 0,
            top_k: Some(100),
            window_w: 1100,
            window_h: 700,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerState {
    pub options: RunOptions,
    pub gui: GuiState,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            options: RunOptions::from_env(),
            gui: GuiState::default(),
        }
    }
}

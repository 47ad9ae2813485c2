// src/gui/components/mod.rs
pub mod action_bar;
pub mod feed_panel;
pub mod ranking_table;

pub mod config;
pub mod context;
pub mod data;
pub mod graph;
pub mod logging;
pub mod ui;

pub mod activity;
pub mod viewmodels;

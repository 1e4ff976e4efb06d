pub mod json;
pub mod prefs;
pub mod remote;
pub mod repository;
pub mod session;
pub mod settings;

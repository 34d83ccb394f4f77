// src/source/mod.rs
pub mod api;
pub mod scrape;

//! Core library for date-calendar-online-sync
pub mod config;
pub mod models;
pub mod store;
pub mod sync;
pub mod ingest;
pub mod calendar;
pub mod planner;
pub mod util;

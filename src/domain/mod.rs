pub mod day_grouping;
pub mod event_store;
pub mod models;
pub mod recorder;
pub mod time_format;

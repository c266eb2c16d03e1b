// qbrank application library: configuration, data loading, caching and
// report rendering around the scoring engine.

pub mod cache;
pub mod config;
pub mod ingest;
pub mod report;

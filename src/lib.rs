pub mod aggregate;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fields;
pub mod ingest;
pub mod output;
pub mod pairing;
pub mod reconcile;
pub mod resolve;
pub mod search;
pub mod submitter_index;
pub mod workflow;

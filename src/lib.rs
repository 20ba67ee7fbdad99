pub mod api;
pub mod config;
pub mod fetch;
pub mod humanize;
pub mod hub;
pub mod ledger;
pub mod observability;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod server;
pub mod worker;

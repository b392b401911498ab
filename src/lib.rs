pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod output;
pub mod pipeline;
pub mod stats;

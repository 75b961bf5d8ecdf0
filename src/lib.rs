pub mod analyzers;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod parser;
pub mod selection;
pub mod stats;
pub mod trip;

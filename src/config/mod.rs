//! Configuration module for imgscrape
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use imgscrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("imgscrape.toml")).unwrap();
//! println!("IIIF endpoint: {}", config.iiif.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FailurePolicy, HttpConfig, IiifConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

//! Regenerate and edit game sprites from a markdown prompt catalog.
//!
//! Prompts live in a markdown catalog, images come from a generative image
//! API, and the final sprite is produced by external resize/encode tools.
//! Every overwrite is preceded by a versioned backup.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod error_codes;
pub mod paths;
pub mod versions;
pub mod workflow;

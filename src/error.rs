//! Error taxonomy for the product pipeline.
//!
//! Pipeline-scoped failures (generation, batch publish) abort a run;
//! stage-scoped failures (render, marketplace) are caught per concept
//! and recorded in the run report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Network or provider outage on a round trip.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Generation response does not match the requested shape.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Render or filesystem failure.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Batch-level asset hosting failure. All-or-nothing: a partially
    /// published directory counts as a total failure.
    #[error("Publish failure: {0}")]
    Publish(String),

    /// Per-concept registration, listing, or publish failure.
    #[error("Marketplace error: {0}")]
    Marketplace(String),

    /// Missing or invalid startup configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

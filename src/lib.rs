//! ShirtForge Core - AI T-Shirt Product Pipeline
//!
//! # Stage Order (Non-Negotiable)
//! 1. Generate concepts (typed decode, abort on schema violation)
//! 2. Render each concept's text to a run-scoped PNG (skip on failure)
//! 3. Publish the whole run directory as one batch (abort on failure)
//! 4. Create + publish one marketplace listing per concept (record failures)
//!
//! External providers sit behind narrow traits; the orchestrator owns the
//! run directory and the in-memory batch and issues one call at a time.

pub mod concept;
pub mod config;
pub mod error;
pub mod generate;
pub mod marketplace;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod render;

pub use concept::{sanitize_title, unique_file_keys, DesignConcept, GenerationBatch};
pub use config::PipelineConfig;
pub use error::{ForgeError, Result};
pub use generate::{ChatMessage, ConceptGenerator, OpenAiGenerator};
pub use marketplace::{
    ListingRequest, ListingState, Marketplace, MarketplaceListing, PrintifyMarketplace, VariantSet,
};
pub use pipeline::{ConceptOutcome, ConceptReport, PipelineSettings, ProductPipeline, RunReport};
pub use publish::{AssetPublisher, GithubPublisher};
pub use render::{BlockTextRenderer, TextRenderer};

pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

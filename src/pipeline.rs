//! Product Pipeline - Single Entry Point
//!
//! Stage order: generate -> render -> host -> list. Render and marketplace
//! failures are recorded per concept and the run continues; generation and
//! batch-publish failures abort the run. Report entries stay in input order.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::concept::{unique_file_keys, GenerationBatch};
use crate::error::{ForgeError, Result};
use crate::generate::ConceptGenerator;
use crate::marketplace::{ListingRequest, Marketplace, MarketplaceListing, VariantSet};
use crate::prompt;
use crate::publish::AssetPublisher;
use crate::render::TextRenderer;

/// Lexicographically sortable run-directory stamp; one-second resolution
/// bounds distinct runs per second.
const RUN_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Per-run knobs. Blueprint 6 is the Unisex Gildan T-Shirt, provider 99 the
/// Printify Choice fulfillment vendor.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Text color as `#RRGGBB`. The unfinished light/dark two-variant idea
    /// from the original program is out of scope; this knob is the
    /// extension point.
    pub text_color: String,
    /// Root under which each run creates its timestamped directory.
    pub output_root: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            blueprint_id: 6,
            print_provider_id: 99,
            canvas_width: 1000,
            canvas_height: 1000,
            text_color: "#000000".to_string(),
            output_root: PathBuf::from("img"),
        }
    }
}

/// Where a concept ended up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConceptOutcome {
    /// Rendered, hosted, listed, and published.
    Published { listing_id: String },
    /// Never rendered; excluded from every later stage.
    SkippedAtRender { reason: String },
    /// Rendered and hosted, but registration/listing/publish failed.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptReport {
    pub title: String,
    /// Sanitized, de-duplicated key used for the file name and URL segment.
    pub file_key: String,
    pub outcome: ConceptOutcome,
}

/// Final per-concept accounting for one run, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub idea: String,
    pub requested: usize,
    pub entries: Vec<ConceptReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ConceptOutcome::Published { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ConceptOutcome::SkippedAtRender { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ConceptOutcome::Failed { .. }))
    }

    /// True when every concept reached a published listing: no render skips
    /// and no marketplace failures.
    pub fn all_published(&self) -> bool {
        self.skipped() == 0 && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&ConceptOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// The pipeline orchestrator. Owns the run directory and the in-memory
/// batch; collaborators receive read-only input and return new data.
pub struct ProductPipeline {
    generator: Box<dyn ConceptGenerator>,
    renderer: Box<dyn TextRenderer>,
    publisher: Box<dyn AssetPublisher>,
    marketplace: Box<dyn Marketplace>,
    settings: PipelineSettings,
}

impl ProductPipeline {
    pub fn new(
        generator: Box<dyn ConceptGenerator>,
        renderer: Box<dyn TextRenderer>,
        publisher: Box<dyn AssetPublisher>,
        marketplace: Box<dyn Marketplace>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            renderer,
            publisher,
            marketplace,
            settings,
        }
    }

    /// Run the pipeline end to end for one idea.
    ///
    /// Returns the per-concept report, or an error if the run aborted in a
    /// pipeline-scoped stage (generation decode, batch publish).
    pub fn run(&self, idea: &str, count: usize) -> Result<RunReport> {
        if idea.trim().is_empty() {
            return Err(ForgeError::Config("idea must be non-empty".into()));
        }

        let mut report = RunReport {
            idea: idea.to_string(),
            requested: count,
            entries: Vec::new(),
        };

        // Empty batch is a valid no-op run: no external call of any kind.
        if count == 0 {
            tracing::info!(idea, "requested 0 patterns, nothing to do");
            return Ok(report);
        }

        // The variant set is a property of the blueprint/provider pair;
        // fetched up front so a marketplace outage aborts before any asset
        // exists.
        let variants = self
            .marketplace
            .variant_set(self.settings.blueprint_id, self.settings.print_provider_id)?;

        let batch = self.generate_batch(idea, count)?;
        if batch.len() != count {
            tracing::warn!(
                requested = count,
                returned = batch.len(),
                "generation returned a different concept count"
            );
        }

        let keys = unique_file_keys(&batch.concepts);
        let run_stamp = Local::now().format(RUN_STAMP_FORMAT).to_string();
        let run_dir = self.settings.output_root.join(&run_stamp);

        // Render stage: independent per concept, skip-and-continue.
        let mut rendered = Vec::with_capacity(batch.len());
        for (concept, key) in batch.concepts.iter().zip(&keys) {
            let outcome = match &concept.shirt_text {
                None => {
                    tracing::warn!(title = %concept.title, "concept has no shirt text, skipping");
                    Some("generation omitted the shirt text".to_string())
                }
                Some(text) => {
                    let dest = run_dir.join(format!("{}.png", key));
                    match self.renderer.render(
                        text,
                        self.settings.canvas_width,
                        self.settings.canvas_height,
                        &self.settings.text_color,
                        &dest,
                    ) {
                        Ok(()) => {
                            tracing::info!(title = %concept.title, file = %dest.display(), "rendered");
                            None
                        }
                        Err(e) => {
                            tracing::warn!(title = %concept.title, error = %e, "render failed, skipping");
                            Some(format!("render failed: {}", e))
                        }
                    }
                }
            };
            rendered.push(outcome.is_none());
            report.entries.push(ConceptReport {
                title: concept.title.clone(),
                file_key: key.clone(),
                outcome: match outcome {
                    Some(reason) => ConceptOutcome::SkippedAtRender { reason },
                    // Placeholder until the marketplace stage resolves it.
                    None => ConceptOutcome::Failed {
                        reason: "not listed".to_string(),
                    },
                },
            });
        }

        if !rendered.iter().any(|r| *r) {
            tracing::warn!("no concept survived the render stage, nothing to publish");
            return Ok(report);
        }

        // Batch boundary: downstream URLs come from the publisher's
        // externally visible location, so no marketplace work starts until
        // the whole directory is up.
        let base_url = self.publisher.publish(&run_dir)?;

        for (index, concept) in batch.concepts.iter().enumerate() {
            if !rendered[index] {
                continue;
            }
            let image_url = format!("{}/{}.png", base_url, keys[index]);
            match self.list_concept(&variants, concept, &image_url) {
                Ok(listing) => {
                    tracing::info!(title = %concept.title, listing_id = %listing.id, "published listing");
                    report.entries[index].outcome = ConceptOutcome::Published {
                        listing_id: listing.id,
                    };
                }
                Err(e) => {
                    tracing::warn!(title = %concept.title, error = %e, "marketplace stage failed");
                    report.entries[index].outcome = ConceptOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "run complete"
        );
        Ok(report)
    }

    /// One generation round trip plus typed decode, retried at most once on
    /// a transport or schema failure. Stylistic dissatisfaction is never a
    /// retry reason.
    fn generate_batch(&self, idea: &str, count: usize) -> Result<GenerationBatch> {
        let messages = prompt::build_messages(idea, count);
        let schema = prompt::concept_list_schema();

        let attempt = || -> Result<GenerationBatch> {
            let payload = self.generator.generate(&messages, &schema)?;
            GenerationBatch::from_payload(count, &payload)
        };

        match attempt() {
            Ok(batch) => Ok(batch),
            Err(e @ (ForgeError::Transport(_) | ForgeError::SchemaViolation(_))) => {
                tracing::warn!(error = %e, "generation failed, retrying once");
                attempt()
            }
            Err(e) => Err(e),
        }
    }

    /// Per-concept marketplace steps: register the hosted image, create the
    /// listing, publish it. A create without a publish counts as a failed
    /// concept; there is no automatic retry.
    fn list_concept(
        &self,
        variants: &VariantSet,
        concept: &crate::concept::DesignConcept,
        image_url: &str,
    ) -> Result<MarketplaceListing> {
        let image_id = self.marketplace.register_image(image_url)?;
        let listing = self.marketplace.create_listing(&ListingRequest {
            blueprint_id: variants.blueprint_id,
            print_provider_id: variants.print_provider_id,
            variant_ids: variants.variant_ids.clone(),
            image_id,
            title: concept.title.clone(),
            description: concept.description.clone(),
            tags: concept.marketing_tags.clone(),
        })?;
        self.marketplace.publish_listing(&listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, outcome: ConceptOutcome) -> ConceptReport {
        ConceptReport {
            title: title.to_string(),
            file_key: title.to_string(),
            outcome,
        }
    }

    #[test]
    fn test_report_counts_each_outcome() {
        let report = RunReport {
            idea: "x".to_string(),
            requested: 3,
            entries: vec![
                entry("a", ConceptOutcome::Published { listing_id: "p1".to_string() }),
                entry("b", ConceptOutcome::SkippedAtRender { reason: "no text".to_string() }),
                entry("c", ConceptOutcome::Failed { reason: "listing rejected".to_string() }),
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_all_published_requires_no_skips_and_no_failures() {
        let clean = RunReport {
            idea: "x".to_string(),
            requested: 1,
            entries: vec![entry("a", ConceptOutcome::Published { listing_id: "p1".to_string() })],
        };
        assert!(clean.all_published());

        // A skipped concept is not a success even though nothing failed.
        let skipped = RunReport {
            idea: "x".to_string(),
            requested: 1,
            entries: vec![entry("a", ConceptOutcome::SkippedAtRender { reason: "no text".to_string() })],
        };
        assert_eq!(skipped.failed(), 0);
        assert!(!skipped.all_published());

        let failed = RunReport {
            idea: "x".to_string(),
            requested: 1,
            entries: vec![entry("a", ConceptOutcome::Failed { reason: "rejected".to_string() })],
        };
        assert!(!failed.all_published());
    }
}

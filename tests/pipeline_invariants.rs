//! Orchestration Invariant Tests
//!
//! These drive the whole pipeline through stub collaborators and verify the
//! stage contracts: input-order processing, skip-and-continue at render and
//! marketplace, the batch publish boundary, and the final report.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shirtforge_core::{
    AssetPublisher, BlockTextRenderer, ConceptGenerator, ConceptOutcome, ForgeError,
    ListingRequest, ListingState, Marketplace, MarketplaceListing, PipelineSettings,
    ProductPipeline, TextRenderer, VariantSet,
};

/// Shared call recorder the stubs write into and tests assert on.
#[derive(Default)]
struct CallLog {
    generate_calls: Mutex<usize>,
    variant_fetches: Mutex<usize>,
    publish_dirs: Mutex<Vec<PathBuf>>,
    registered_urls: Mutex<Vec<String>>,
    created_titles: Mutex<Vec<String>>,
    published_ids: Mutex<Vec<String>>,
}

struct StubGenerator {
    payload: Value,
    log: Arc<CallLog>,
}

impl ConceptGenerator for StubGenerator {
    fn generate(&self, _messages: &[shirtforge_core::ChatMessage], _schema: &Value) -> Result<Value, ForgeError> {
        *self.log.generate_calls.lock().unwrap() += 1;
        Ok(self.payload.clone())
    }
}

struct StubPublisher {
    base_url: String,
    fail: bool,
    log: Arc<CallLog>,
}

impl AssetPublisher for StubPublisher {
    fn publish(&self, dir: &Path) -> Result<String, ForgeError> {
        self.log.publish_dirs.lock().unwrap().push(dir.to_path_buf());
        if self.fail {
            return Err(ForgeError::Publish("host rejected the batch".into()));
        }
        let dir_name = dir.file_name().unwrap().to_str().unwrap();
        Ok(format!("{}/{}", self.base_url, dir_name))
    }
}

struct StubMarketplace {
    log: Arc<CallLog>,
}

impl Marketplace for StubMarketplace {
    fn variant_set(&self, blueprint_id: u32, print_provider_id: u32) -> Result<VariantSet, ForgeError> {
        *self.log.variant_fetches.lock().unwrap() += 1;
        Ok(VariantSet {
            blueprint_id,
            print_provider_id,
            variant_ids: vec![101, 102],
        })
    }

    fn register_image(&self, url: &str) -> Result<String, ForgeError> {
        let mut urls = self.log.registered_urls.lock().unwrap();
        urls.push(url.to_string());
        Ok(format!("img-{}", urls.len()))
    }

    fn create_listing(&self, request: &ListingRequest) -> Result<MarketplaceListing, ForgeError> {
        let mut titles = self.log.created_titles.lock().unwrap();
        titles.push(request.title.clone());
        Ok(MarketplaceListing {
            id: format!("prod-{}", titles.len()),
            image_id: request.image_id.clone(),
            title: request.title.clone(),
            state: ListingState::Created,
        })
    }

    fn publish_listing(&self, listing: &MarketplaceListing) -> Result<MarketplaceListing, ForgeError> {
        self.log.published_ids.lock().unwrap().push(listing.id.clone());
        Ok(MarketplaceListing {
            state: ListingState::Published,
            ..listing.clone()
        })
    }
}

/// Renderer that fails for one specific shirt text and otherwise delegates
/// to the real block renderer.
struct FailingRenderer {
    fail_text: String,
    inner: BlockTextRenderer,
}

impl TextRenderer for FailingRenderer {
    fn render(&self, text: &str, width: u32, height: u32, color: &str, dest: &Path) -> Result<(), ForgeError> {
        if text == self.fail_text {
            return Err(ForgeError::Io(std::io::Error::other("disk full")));
        }
        self.inner.render(text, width, height, color, dest)
    }
}

fn robot_cats_payload() -> Value {
    json!({
        "patterns": [
            {"title": "Cat1", "description": "d1", "tshirt_text": "MEOW", "marketing_tags": ["cats"]},
            {"title": "Cat2", "description": "d2", "tshirt_text": "PURR", "marketing_tags": ["cats", "robots"]}
        ]
    })
}

fn settings(out_root: &Path) -> PipelineSettings {
    PipelineSettings {
        canvas_width: 128,
        canvas_height: 128,
        output_root: out_root.to_path_buf(),
        ..PipelineSettings::default()
    }
}

fn build_pipeline(
    payload: Value,
    out_root: &Path,
    log: &Arc<CallLog>,
    publisher_fails: bool,
) -> ProductPipeline {
    ProductPipeline::new(
        Box::new(StubGenerator { payload, log: Arc::clone(log) }),
        Box::new(BlockTextRenderer::new()),
        Box::new(StubPublisher {
            base_url: "https://assets.test".to_string(),
            fail: publisher_fails,
            log: Arc::clone(log),
        }),
        Box::new(StubMarketplace { log: Arc::clone(log) }),
        settings(out_root),
    )
}

/// The single timestamped directory a run created under the output root.
fn run_dir(out_root: &Path) -> PathBuf {
    let mut dirs: Vec<_> = std::fs::read_dir(out_root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(dirs.len(), 1, "expected exactly one run directory");
    dirs.pop().unwrap()
}

#[test]
fn invariant_round_trip_two_concepts() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(robot_cats_payload(), out.path(), &log, false);

    let report = pipeline.run("robot cats", 2).unwrap();

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.succeeded(), 2);
    assert!(report.all_published());
    assert_eq!(report.entries[0].title, "Cat1");
    assert_eq!(report.entries[1].title, "Cat2");

    let dir = run_dir(out.path());
    assert!(dir.join("Cat1.png").exists());
    assert!(dir.join("Cat2.png").exists());

    // Registrations in title order, URLs derived from the publisher's base.
    let urls = log.registered_urls.lock().unwrap().clone();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("/Cat1.png"));
    assert!(urls[1].ends_with("/Cat2.png"));
    assert!(urls[0].starts_with("https://assets.test/"));

    assert_eq!(log.published_ids.lock().unwrap().len(), 2);
    assert_eq!(*log.variant_fetches.lock().unwrap(), 1);
    assert_eq!(log.publish_dirs.lock().unwrap().len(), 1);
}

#[test]
fn invariant_count_zero_is_a_noop() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(robot_cats_payload(), out.path(), &log, false);

    let report = pipeline.run("robot cats", 0).unwrap();

    assert!(report.entries.is_empty());
    assert_eq!(*log.generate_calls.lock().unwrap(), 0);
    assert_eq!(*log.variant_fetches.lock().unwrap(), 0);
    assert!(log.publish_dirs.lock().unwrap().is_empty());
    assert!(log.registered_urls.lock().unwrap().is_empty());
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}

#[test]
fn invariant_missing_shirt_text_skips_only_that_concept() {
    let payload = json!({
        "patterns": [
            {"title": "NoText", "description": "d", "marketing_tags": []},
            {"title": "HasText", "description": "d", "tshirt_text": "YES", "marketing_tags": []}
        ]
    });

    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(payload, out.path(), &log, false);

    let report = pipeline.run("idea", 2).unwrap();

    assert!(matches!(
        report.entries[0].outcome,
        ConceptOutcome::SkippedAtRender { .. }
    ));
    assert!(matches!(
        report.entries[1].outcome,
        ConceptOutcome::Published { .. }
    ));

    let dir = run_dir(out.path());
    assert!(!dir.join("NoText.png").exists());
    assert!(dir.join("HasText.png").exists());

    // The skipped concept never reaches the marketplace.
    assert_eq!(log.registered_urls.lock().unwrap().len(), 1);
    assert_eq!(log.created_titles.lock().unwrap().clone(), vec!["HasText"]);
}

#[test]
fn invariant_all_concepts_skipped_skips_publish_and_marketplace() {
    let payload = json!({
        "patterns": [
            {"title": "NoText1", "description": "d", "marketing_tags": []},
            {"title": "NoText2", "description": "d", "marketing_tags": []}
        ]
    });

    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(payload, out.path(), &log, false);

    let report = pipeline.run("idea", 2).unwrap();

    // Every concept is still accounted for in the report.
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.skipped(), 2);
    assert!(!report.all_published());
    assert!(report
        .entries
        .iter()
        .all(|e| matches!(e.outcome, ConceptOutcome::SkippedAtRender { .. })));

    // Nothing rendered, so the publisher and marketplace are never invoked
    // and no run directory is created.
    assert!(log.publish_dirs.lock().unwrap().is_empty());
    assert!(log.registered_urls.lock().unwrap().is_empty());
    assert!(log.created_titles.lock().unwrap().is_empty());
    assert!(std::fs::read_dir(out.path()).unwrap().next().is_none());
}

#[test]
fn invariant_publish_failure_blocks_all_marketplace_work() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(robot_cats_payload(), out.path(), &log, true);

    let err = pipeline.run("robot cats", 2).unwrap_err();
    assert!(matches!(err, ForgeError::Publish(_)));

    // Renders happened, but zero registrations and zero listings.
    assert!(run_dir(out.path()).join("Cat1.png").exists());
    assert!(log.registered_urls.lock().unwrap().is_empty());
    assert!(log.created_titles.lock().unwrap().is_empty());
    assert!(log.published_ids.lock().unwrap().is_empty());
}

#[test]
fn invariant_duplicate_titles_get_distinct_files() {
    let payload = json!({
        "patterns": [
            {"title": "Cat", "description": "d1", "tshirt_text": "A", "marketing_tags": []},
            {"title": "Cat", "description": "d2", "tshirt_text": "B", "marketing_tags": []}
        ]
    });

    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(payload, out.path(), &log, false);

    let report = pipeline.run("cats", 2).unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_ne!(report.entries[0].file_key, report.entries[1].file_key);

    let dir = run_dir(out.path());
    assert!(dir.join("Cat.png").exists());
    assert!(dir.join("Cat_2.png").exists());

    let urls = log.registered_urls.lock().unwrap().clone();
    assert_ne!(urls[0], urls[1]);
}

#[test]
fn invariant_malformed_payload_aborts_after_one_retry() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(json!({"patterns": "nope"}), out.path(), &log, false);

    let err = pipeline.run("idea", 3).unwrap_err();
    assert!(matches!(err, ForgeError::SchemaViolation(_)));

    // One retry, no more.
    assert_eq!(*log.generate_calls.lock().unwrap(), 2);
    assert!(log.publish_dirs.lock().unwrap().is_empty());
    assert!(log.registered_urls.lock().unwrap().is_empty());
}

#[test]
fn invariant_render_failure_skips_only_that_concept() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());

    let pipeline = ProductPipeline::new(
        Box::new(StubGenerator {
            payload: robot_cats_payload(),
            log: Arc::clone(&log),
        }),
        Box::new(FailingRenderer {
            fail_text: "MEOW".to_string(),
            inner: BlockTextRenderer::new(),
        }),
        Box::new(StubPublisher {
            base_url: "https://assets.test".to_string(),
            fail: false,
            log: Arc::clone(&log),
        }),
        Box::new(StubMarketplace { log: Arc::clone(&log) }),
        settings(out.path()),
    );

    let report = pipeline.run("robot cats", 2).unwrap();

    assert!(matches!(
        report.entries[0].outcome,
        ConceptOutcome::SkippedAtRender { .. }
    ));
    assert!(matches!(
        report.entries[1].outcome,
        ConceptOutcome::Published { .. }
    ));
    assert_eq!(log.created_titles.lock().unwrap().clone(), vec!["Cat2"]);
}

#[test]
fn invariant_n_concepts_yield_n_images_and_listings() {
    let patterns: Vec<Value> = (0..4)
        .map(|i| {
            json!({
                "title": format!("Design{}", i),
                "description": "d",
                "tshirt_text": format!("TEXT {}", i),
                "marketing_tags": ["tag"]
            })
        })
        .collect();

    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(json!({ "patterns": patterns }), out.path(), &log, false);

    let report = pipeline.run("idea", 4).unwrap();
    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.succeeded(), 4);

    let images = std::fs::read_dir(run_dir(out.path())).unwrap().count();
    assert_eq!(images, 4);
    assert_eq!(log.published_ids.lock().unwrap().len(), 4);
}

#[test]
fn invariant_empty_shirt_text_renders_blank_not_skipped() {
    let payload = json!({
        "patterns": [
            {"title": "Blank", "description": "d", "tshirt_text": "", "marketing_tags": []}
        ]
    });

    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(payload, out.path(), &log, false);

    let report = pipeline.run("idea", 1).unwrap();
    assert_eq!(report.succeeded(), 1);
    assert!(run_dir(out.path()).join("Blank.png").exists());
}

#[test]
fn invariant_fewer_concepts_than_requested_is_tolerated() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(CallLog::default());
    let pipeline = build_pipeline(robot_cats_payload(), out.path(), &log, false);

    // Requested 5, the stub returns 2; the run completes with 2 entries.
    let report = pipeline.run("robot cats", 5).unwrap();
    assert_eq!(report.requested, 5);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.succeeded(), 2);
}

//! Marketplace client - Printify listings
//!
//! Three per-concept operations (register image, create listing, publish
//! listing) plus the per-run variant-set fetch. The variant set belongs to
//! the blueprint/provider pair, not to any individual design, so it is
//! fetched once and reused across the batch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{ForgeError, Result};

const DEFAULT_API_URL: &str = "https://api.printify.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;
/// Listing price applied to every enabled variant, in cents.
const DEFAULT_PRICE_CENTS: u32 = 1999;

/// Purchasable options (size/color) for a blueprint + print provider pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSet {
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    pub variant_ids: Vec<u64>,
}

/// Everything needed to create one listing.
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub blueprint_id: u32,
    pub print_provider_id: u32,
    pub variant_ids: Vec<u64>,
    pub image_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    Created,
    Published,
}

/// A marketplace product listing and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceListing {
    pub id: String,
    pub image_id: String,
    pub title: String,
    pub state: ListingState,
}

/// Trait implemented by marketplace providers (Printify, test doubles).
pub trait Marketplace {
    /// Fetch the variant set for a blueprint/provider pair. Called once per
    /// run, never per concept.
    fn variant_set(&self, blueprint_id: u32, print_provider_id: u32) -> Result<VariantSet>;

    /// Register a hosted image by URL, returning the marketplace image id.
    fn register_image(&self, url: &str) -> Result<String>;

    /// Create a listing in state `Created`.
    fn create_listing(&self, request: &ListingRequest) -> Result<MarketplaceListing>;

    /// Publish a created listing, returning it in state `Published`.
    fn publish_listing(&self, listing: &MarketplaceListing) -> Result<MarketplaceListing>;
}

/// Printify v1 REST implementation.
pub struct PrintifyMarketplace {
    api_token: String,
    shop_id: String,
    api_url: String,
}

impl PrintifyMarketplace {
    pub fn new(api_token: impl Into<String>, shop_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            shop_id: shop_id.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn get(&self, path: &str) -> Result<Value> {
        let agent = build_agent();
        let mut response = agent
            .get(&format!("{}/{}", self.api_url, path))
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .call()
            .map_err(|e| ForgeError::Transport(format!("GET {} failed: {}", path, e)))?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| ForgeError::Marketplace(format!("unreadable response for {}: {}", path, e)))
    }

    fn post(&self, path: &str, payload: &Value) -> Result<Value> {
        let agent = build_agent();
        let mut response = agent
            .post(&format!("{}/{}", self.api_url, path))
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send_json(payload)
            .map_err(|e| ForgeError::Transport(format!("POST {} failed: {}", path, e)))?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| ForgeError::Marketplace(format!("unreadable response for {}: {}", path, e)))
    }
}

impl Marketplace for PrintifyMarketplace {
    fn variant_set(&self, blueprint_id: u32, print_provider_id: u32) -> Result<VariantSet> {
        let path = format!(
            "catalog/blueprints/{}/print_providers/{}/variants.json",
            blueprint_id, print_provider_id
        );
        let body = self.get(&path)?;

        let variant_ids: Vec<u64> = body
            .get("variants")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.get("id")?.as_u64()).collect())
            .unwrap_or_default();

        if variant_ids.is_empty() {
            return Err(ForgeError::Marketplace(format!(
                "no variants for blueprint {} / provider {}",
                blueprint_id, print_provider_id
            )));
        }

        Ok(VariantSet {
            blueprint_id,
            print_provider_id,
            variant_ids,
        })
    }

    fn register_image(&self, url: &str) -> Result<String> {
        let file_name = url.rsplit('/').next().unwrap_or("design.png");
        let body = self.post(
            "uploads/images.json",
            &json!({ "file_name": file_name, "url": url }),
        )?;

        body.get("id")
            .and_then(id_as_string)
            .ok_or_else(|| ForgeError::Marketplace("image registration returned no id".into()))
    }

    fn create_listing(&self, request: &ListingRequest) -> Result<MarketplaceListing> {
        let variants: Vec<Value> = request
            .variant_ids
            .iter()
            .map(|id| json!({ "id": id, "price": DEFAULT_PRICE_CENTS, "is_enabled": true }))
            .collect();

        let payload = json!({
            "title": request.title,
            "description": request.description,
            "tags": request.tags,
            "blueprint_id": request.blueprint_id,
            "print_provider_id": request.print_provider_id,
            "variants": variants,
            "print_areas": [{
                "variant_ids": request.variant_ids,
                "placeholders": [{
                    "position": "front",
                    "images": [{
                        "id": request.image_id,
                        "x": 0.5,
                        "y": 0.5,
                        "scale": 1.0,
                        "angle": 0
                    }]
                }]
            }]
        });

        let path = format!("shops/{}/products.json", self.shop_id);
        let body = self.post(&path, &payload)?;

        let id = body
            .get("id")
            .and_then(id_as_string)
            .ok_or_else(|| ForgeError::Marketplace("product creation returned no id".into()))?;

        Ok(MarketplaceListing {
            id,
            image_id: request.image_id.clone(),
            title: request.title.clone(),
            state: ListingState::Created,
        })
    }

    fn publish_listing(&self, listing: &MarketplaceListing) -> Result<MarketplaceListing> {
        let path = format!("shops/{}/products/{}/publish.json", self.shop_id, listing.id);
        self.post(
            &path,
            &json!({
                "title": true,
                "description": true,
                "images": true,
                "variants": true,
                "tags": true,
            }),
        )?;

        Ok(MarketplaceListing {
            state: ListingState::Published,
            ..listing.clone()
        })
    }
}

/// Printify ids arrive as strings for uploads and integers for products.
fn id_as_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_as_string_handles_both_wire_forms() {
        assert_eq!(id_as_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(id_as_string(&json!(42)), Some("42".to_string()));
        assert_eq!(id_as_string(&json!(null)), None);
    }

    #[test]
    fn test_listing_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ListingState::Published).unwrap(),
            "\"published\""
        );
    }
}

//! Instruction templates and the response schema descriptor
//!
//! One generation request carries the idea, the requested concept count, and
//! a fixed product-constraints block describing the print blueprint. The
//! schema descriptor is sent as the structured-output shape; the wire field
//! is `tshirt_text` (the historical spelling), decode accepts both.

use serde_json::{json, Value};

use crate::generate::ChatMessage;

pub const SYSTEM_MESSAGE: &str = "You are a helpful chatbot";

/// Print-area constraints for blueprint 6 (Unisex Gildan T-Shirt).
pub const BLUEPRINT_6_DESCRIPTION: &str = "\
The design is printed on the front of a Unisex Gildan T-Shirt. \
The print area is a square, roughly 1000x1000 pixels, centered on the chest. \
The shirt text is printed as large plain block lettering in a single color \
on a plain background, so it must read well at a distance. Keep the text \
short and punchy; slogans over roughly eight words print too small.";

pub fn user_message(count: usize, idea: &str) -> String {
    format!(
        "Give me {} t-shirt design patterns for the following idea: {}. \
         For each pattern provide a short unique title, a one-paragraph \
         marketing description, the exact text to print on the shirt, and a \
         list of marketing tags. {}",
        count, idea, BLUEPRINT_6_DESCRIPTION
    )
}

/// The full message sequence for one generation request.
pub fn build_messages(idea: &str, count: usize) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_MESSAGE),
        ChatMessage::user(user_message(count, idea)),
    ]
}

/// JSON-schema shape the generation client must return: a mapping with a
/// `patterns` key holding the ordered concept records.
pub fn concept_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patterns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "tshirt_text": { "type": "string" },
                        "marketing_tags": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["title", "description", "tshirt_text", "marketing_tags"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["patterns"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_embeds_idea_and_count() {
        let msg = user_message(4, "robot cats");
        assert!(msg.contains("4 t-shirt design patterns"));
        assert!(msg.contains("robot cats"));
        assert!(msg.contains("Unisex Gildan T-Shirt"));
    }

    #[test]
    fn test_messages_are_system_then_user() {
        let messages = build_messages("robot cats", 2);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_schema_requires_patterns() {
        let schema = concept_list_schema();
        assert_eq!(schema["required"][0], "patterns");
        let item_required = &schema["properties"]["patterns"]["items"]["required"];
        assert!(item_required.as_array().unwrap().iter().any(|v| v == "tshirt_text"));
    }
}

use schemars::schema::RootSchema;
use tracing::{info, warn};

use ddr_common::text::truncate_chars;
use ddr_common::{DocumentExtraction, DocumentKind};

use super::strip_code_blocks;

const PREVIEW_CHARS: usize = 200;

/// JSON schema the extraction collaborator is asked to produce.
pub fn extraction_schema() -> RootSchema {
    schemars::schema_for!(DocumentExtraction)
}

/// Decode one document's extraction response.
///
/// Never fails: a response that is not a JSON object becomes a placeholder
/// whose only content is an `ambiguous` note quoting the start of the text.
pub fn parse_extraction_response(response: &str, kind: DocumentKind) -> DocumentExtraction {
    match serde_json::from_str::<DocumentExtraction>(strip_code_blocks(response)) {
        Ok(extraction) => {
            info!(
                document = %kind,
                observations = extraction.observations.len(),
                temperatures = extraction.temperatures.len(),
                "Decoded extraction response"
            );
            extraction
        }
        Err(e) => {
            warn!(document = %kind, error = %e, "Extraction response was not valid JSON");
            DocumentExtraction::placeholder(format!(
                "Could not parse LLM response as JSON: {}...",
                truncate_chars(response, PREVIEW_CHARS)
            ))
        }
    }
}

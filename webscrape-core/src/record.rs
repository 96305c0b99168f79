use crate::result::ExtractionResult;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ATTR_URL: &str = "webscraper.url";
pub const ATTR_DATA: &str = "webscraper.data";
pub const ATTR_ERROR: &str = "webscraper.error";
pub const ATTR_ERROR_KIND: &str = "webscraper.error.kind";

/// Channel a host routes a record to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Success,
    Failure,
}

impl Relationship {
    pub fn name(&self) -> &'static str {
        match self {
            Relationship::Success => "success",
            Relationship::Failure => "failure",
        }
    }
}

/// An extraction result flattened into routed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    pub relationship: Relationship,
    pub attributes: BTreeMap<String, String>,
}

impl FlowRecord {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl From<ExtractionResult> for FlowRecord {
    fn from(result: ExtractionResult) -> Self {
        let mut attributes = BTreeMap::new();
        let relationship = match result {
            ExtractionResult::Success {
                url,
                extracted_text,
            } => {
                attributes.insert(ATTR_URL.to_string(), url);
                attributes.insert(ATTR_DATA.to_string(), extracted_text);
                Relationship::Success
            }
            ExtractionResult::Failure {
                url,
                error_kind,
                message,
            } => {
                attributes.insert(ATTR_URL.to_string(), url);
                attributes.insert(ATTR_ERROR.to_string(), message);
                attributes.insert(ATTR_ERROR_KIND.to_string(), error_kind.as_str().to_string());
                Relationship::Failure
            }
        };
        Self {
            relationship,
            attributes,
        }
    }
}

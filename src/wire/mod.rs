use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// ========================================
/// Model contract and stored records
/// ========================================

/// Payload the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub pages: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub styles: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSite {
    pub id: Uuid,
    pub pages: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<IndexMap<String, String>>,
    pub styles: String,
    pub timestamp: DateTime<Utc>,
}

impl GeneratedSite {
    pub fn from_content(content: GeneratedContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            pages: content.pages,
            components: content.components,
            styles: content.styles,
            timestamp: Utc::now(),
        }
    }

    pub fn page_keys(&self) -> Vec<String> {
        self.pages.keys().cloned().collect()
    }

    pub fn summary(&self) -> SiteSummary {
        SiteSummary { id: self.id, pages: self.page_keys(), timestamp: self.timestamp }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub id: Uuid,
    pub pages: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A per-element patch. At most one per (site, element) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementEdit {
    pub site_id: Uuid,
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<IndexMap<String, Value>>,
}

/// System and user prompt pair sent to a completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleHint {
    Modern,
    Classic,
    Minimal,
}

/// ========================================
/// HTTP request bodies
/// ========================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    #[serde(default)]
    pub style: Option<StyleHint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(default)]
    pub element_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub styles: Option<IndexMap<String, Value>>,
}

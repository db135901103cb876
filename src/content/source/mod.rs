
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::Path;

use crate::{RagError, Result};

fn published_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LexiconTerm {
    pub id: i64,
    pub term: String,
    pub definition: String,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Certification {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "published_by_default")]
    pub published: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One key/value field of the company profile (name, address, opening hours...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CompanyInfoField {
    pub key: String,
    pub value: String,
}

/// Where the indexer reads raw site content from.
///
/// Implementations return every record, including unpublished and deleted
/// ones; filtering is the normalizers' job.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn projects(&self) -> Result<Vec<Project>>;
    async fn faq_entries(&self) -> Result<Vec<FaqEntry>>;
    async fn lexicon_terms(&self) -> Result<Vec<LexiconTerm>>;
    async fn certifications(&self) -> Result<Vec<Certification>>;
    async fn services(&self) -> Result<Vec<Service>>;
    async fn company_info(&self) -> Result<Vec<CompanyInfoField>>;
}

/// A complete export of the site content, as read from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSnapshot {
    pub projects: Vec<Project>,
    pub faq: Vec<FaqEntry>,
    pub lexique: Vec<LexiconTerm>,
    pub certifications: Vec<Certification>,
    pub services: Vec<Service>,
    pub company_info: Vec<CompanyInfoField>,
}

impl ContentSnapshot {
    #[inline]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            RagError::ContentSource(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Number of raw records across every domain
    #[inline]
    pub fn record_count(&self) -> usize {
        self.projects.len()
            + self.faq.len()
            + self.lexique.len()
            + self.certifications.len()
            + self.services.len()
            + self.company_info.len()
    }
}

#[async_trait]
impl ContentSource for ContentSnapshot {
    async fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.clone())
    }

    async fn faq_entries(&self) -> Result<Vec<FaqEntry>> {
        Ok(self.faq.clone())
    }

    async fn lexicon_terms(&self) -> Result<Vec<LexiconTerm>> {
        Ok(self.lexique.clone())
    }

    async fn certifications(&self) -> Result<Vec<Certification>> {
        Ok(self.certifications.clone())
    }

    async fn services(&self) -> Result<Vec<Service>> {
        Ok(self.services.clone())
    }

    async fn company_info(&self) -> Result<Vec<CompanyInfoField>> {
        Ok(self.company_info.clone())
    }
}

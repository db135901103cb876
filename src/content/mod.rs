// Content module
// Site content domains, their raw records and the normalizers that turn them
// into embeddable text

pub mod normalize;
pub mod source;


use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

use crate::RagError;

pub use normalize::{Normalize, normalize, normalize_domain, truncate_chars};
pub use source::{
    Certification, CompanyInfoField, ContentSnapshot, ContentSource, FaqEntry, LexiconTerm,
    Project, Service,
};

/// Tag identifying the domain an embedding came from.
///
/// An open set: the well-known domains have constants, any other lowercase
/// identifier is accepted and stored as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    pub const PROJECT: ContentType = ContentType(Cow::Borrowed("project"));
    pub const FAQ: ContentType = ContentType(Cow::Borrowed("faq"));
    pub const LEXIQUE: ContentType = ContentType(Cow::Borrowed("lexique"));
    pub const CERTIFICATION: ContentType = ContentType(Cow::Borrowed("certification"));
    pub const SERVICE: ContentType = ContentType(Cow::Borrowed("service"));
    pub const COMPANY_INFO: ContentType = ContentType(Cow::Borrowed("company_info"));

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        let valid = !tag.is_empty()
            && tag
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if !valid {
            return Err(RagError::InvalidQuery(format!(
                "invalid content type {s:?} (expected a lowercase identifier such as \"faq\")"
            )));
        }

        Ok(ContentType(Cow::Owned(tag)))
    }
}

impl TryFrom<String> for ContentType {
    type Error = RagError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentType> for String {
    #[inline]
    fn from(value: ContentType) -> Self {
        value.0.into_owned()
    }
}

/// The uniform shape every normalizer emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    pub content_type: ContentType,
    pub content_id: String,
    pub content_text: String,
}

/// The content domains the indexer knows how to read, in indexing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Projects,
    Faq,
    Lexique,
    Certifications,
    Services,
    CompanyInfo,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Projects,
        Domain::Faq,
        Domain::Lexique,
        Domain::Certifications,
        Domain::Services,
        Domain::CompanyInfo,
    ];

    #[inline]
    pub fn content_type(self) -> ContentType {
        match self {
            Domain::Projects => ContentType::PROJECT,
            Domain::Faq => ContentType::FAQ,
            Domain::Lexique => ContentType::LEXIQUE,
            Domain::Certifications => ContentType::CERTIFICATION,
            Domain::Services => ContentType::SERVICE,
            Domain::CompanyInfo => ContentType::COMPANY_INFO,
        }
    }

    #[inline]
    pub fn from_content_type(content_type: &ContentType) -> Option<Domain> {
        Domain::ALL
            .into_iter()
            .find(|domain| domain.content_type() == *content_type)
    }

    /// Key used for this domain's count in a reindex summary
    #[inline]
    pub fn summary_key(self) -> &'static str {
        match self {
            Domain::Projects => "projects",
            Domain::Faq => "faq",
            Domain::Lexique => "lexique",
            Domain::Certifications => "certifications",
            Domain::Services => "services",
            Domain::CompanyInfo => "company_info",
        }
    }
}

impl FromStr for Domain {
    type Err = RagError;

    /// Accepts either the content type tag (`project`) or the summary key (`projects`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Domain::ALL
            .into_iter()
            .find(|domain| domain.summary_key() == wanted || domain.content_type().as_str() == wanted)
            .ok_or_else(|| {
                RagError::InvalidQuery(format!(
                    "unknown content domain {s:?} (expected one of: {})",
                    Domain::ALL.map(Domain::summary_key).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for Domain {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary_key())
    }
}

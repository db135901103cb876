
use tracing::debug;

use super::source::{
    Certification, CompanyInfoField, ContentSource, FaqEntry, LexiconTerm, Project, Service,
};
use super::{ContentType, Domain, NormalizedContent};
use crate::Result;

/// Per-domain knowledge of how a raw record becomes embeddable text
pub trait Normalize {
    const CONTENT_TYPE: ContentType;

    fn content_id(&self) -> String;

    /// Unpublished and soft-deleted records must never reach the index
    fn is_indexable(&self) -> bool;

    fn compose_text(&self) -> String;
}

/// Normalize a batch of raw records of one domain.
///
/// Non-indexable records and records with blank text are dropped; text longer
/// than `max_chars` characters is truncated.
#[inline]
pub fn normalize<T: Normalize>(records: &[T], max_chars: usize) -> Vec<NormalizedContent> {
    let normalized: Vec<NormalizedContent> = records
        .iter()
        .filter(|record| record.is_indexable())
        .filter_map(|record| {
            let text = record.compose_text();
            if text.trim().is_empty() {
                return None;
            }
            Some(NormalizedContent {
                content_type: T::CONTENT_TYPE,
                content_id: record.content_id(),
                content_text: truncate_chars(&text, max_chars),
            })
        })
        .collect();

    debug!(
        "Normalized {} of {} {} records",
        normalized.len(),
        records.len(),
        T::CONTENT_TYPE
    );
    normalized
}

/// Fetch one domain's raw records from the source and normalize them
#[inline]
pub async fn normalize_domain(
    domain: Domain,
    source: &dyn ContentSource,
    max_chars: usize,
) -> Result<Vec<NormalizedContent>> {
    let normalized = match domain {
        Domain::Projects => normalize(&source.projects().await?, max_chars),
        Domain::Faq => normalize(&source.faq_entries().await?, max_chars),
        Domain::Lexique => normalize(&source.lexicon_terms().await?, max_chars),
        Domain::Certifications => normalize(&source.certifications().await?, max_chars),
        Domain::Services => normalize(&source.services().await?, max_chars),
        Domain::CompanyInfo => normalize(&source.company_info().await?, max_chars),
    };
    Ok(normalized)
}

/// Cut `text` to at most `max_chars` characters, on a character boundary
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Join `Label: value` lines, skipping blank values
fn labelled_lines(fields: &[(&str, Option<&str>)]) -> String {
    fields
        .iter()
        .filter_map(|(label, value)| {
            let value = value.map(str::trim).filter(|v| !v.is_empty())?;
            Some(format!("{label}: {value}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `opening_hours` -> `Opening hours`
fn humanize_key(key: &str) -> String {
    let spaced = key.trim().replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_live(published: bool, deleted_at: Option<&chrono::DateTime<chrono::Utc>>) -> bool {
    published && deleted_at.is_none()
}

impl Normalize for Project {
    const CONTENT_TYPE: ContentType = ContentType::PROJECT;

    fn content_id(&self) -> String {
        self.id.to_string()
    }

    fn is_indexable(&self) -> bool {
        is_live(self.published, self.deleted_at.as_ref())
    }

    fn compose_text(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        labelled_lines(&[
            ("Project", Some(self.title.as_str())),
            ("Description", self.description.as_deref()),
            ("Location", self.location.as_deref()),
            ("Category", self.category.as_deref()),
            ("Year", year.as_deref()),
        ])
    }
}

impl Normalize for FaqEntry {
    const CONTENT_TYPE: ContentType = ContentType::FAQ;

    fn content_id(&self) -> String {
        self.id.to_string()
    }

    fn is_indexable(&self) -> bool {
        is_live(self.published, self.deleted_at.as_ref())
    }

    fn compose_text(&self) -> String {
        labelled_lines(&[
            ("Question", Some(self.question.as_str())),
            ("Answer", Some(self.answer.as_str())),
        ])
    }
}

impl Normalize for LexiconTerm {
    const CONTENT_TYPE: ContentType = ContentType::LEXIQUE;

    fn content_id(&self) -> String {
        self.id.to_string()
    }

    fn is_indexable(&self) -> bool {
        is_live(self.published, self.deleted_at.as_ref())
    }

    fn compose_text(&self) -> String {
        labelled_lines(&[
            ("Term", Some(self.term.as_str())),
            ("Definition", Some(self.definition.as_str())),
        ])
    }
}

impl Normalize for Certification {
    const CONTENT_TYPE: ContentType = ContentType::CERTIFICATION;

    fn content_id(&self) -> String {
        self.id.to_string()
    }

    fn is_indexable(&self) -> bool {
        is_live(self.published, self.deleted_at.as_ref())
    }

    fn compose_text(&self) -> String {
        labelled_lines(&[
            ("Certification", Some(self.name.as_str())),
            ("Issued by", self.issuer.as_deref()),
            ("Description", self.description.as_deref()),
        ])
    }
}

impl Normalize for Service {
    const CONTENT_TYPE: ContentType = ContentType::SERVICE;

    fn content_id(&self) -> String {
        self.id.to_string()
    }

    fn is_indexable(&self) -> bool {
        is_live(self.published, self.deleted_at.as_ref())
    }

    fn compose_text(&self) -> String {
        labelled_lines(&[
            ("Service", Some(self.title.as_str())),
            ("Description", self.description.as_deref()),
        ])
    }
}

impl Normalize for CompanyInfoField {
    const CONTENT_TYPE: ContentType = ContentType::COMPANY_INFO;

    fn content_id(&self) -> String {
        self.key.trim().to_string()
    }

    fn is_indexable(&self) -> bool {
        !self.key.trim().is_empty() && !self.value.trim().is_empty()
    }

    fn compose_text(&self) -> String {
        let label = humanize_key(&self.key);
        labelled_lines(&[(label.as_str(), Some(self.value.as_str()))])
    }
}

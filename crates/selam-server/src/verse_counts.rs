//! Per-chapter verse counts fetched from an external dataset.
//!
//! The dataset is a JSON list of books in canonical order:
//! `[{"book": "Genesis", "chapters": [{"chapter": "1", "verses": "31"}, ...]}, ...]`.
//! It is refetched at most once per [`CACHE_TTL`]; when a refresh fails the
//! previous copy keeps being served.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use selam_shared::VerseCounts;

pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Verse count source unreachable: {0}")]
    Upstream(String),

    #[error("Verse count source returned HTTP {0}")]
    Status(u16),

    #[error("Malformed verse count data: {0}")]
    Malformed(String),
}

// Book and chapter labels are positional in the source, so only the counts
// are read.
#[derive(Debug, Deserialize)]
struct SourceBook {
    chapters: Vec<SourceChapter>,
}

#[derive(Debug, Deserialize)]
struct SourceChapter {
    verses: String,
}

fn parse_source(books: Vec<SourceBook>) -> Result<VerseCounts, CatalogError> {
    let mut table = Vec::with_capacity(books.len());
    for book in books {
        let chapters = book
            .chapters
            .iter()
            .map(|c| {
                c.verses.trim().parse::<u32>().map_err(|_| {
                    CatalogError::Malformed(format!("verse count {:?}", c.verses))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        table.push(chapters);
    }
    Ok(VerseCounts::from_books(table))
}

struct Cached {
    fetched_at: Instant,
    counts: Arc<VerseCounts>,
}

pub struct VerseCountCatalog {
    client: reqwest::Client,
    source_url: String,
    ttl: Duration,
    cached: RwLock<Option<Cached>>,
}

impl VerseCountCatalog {
    pub fn new(source_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Upstream(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            source_url: source_url.into(),
            ttl: CACHE_TTL,
            cached: RwLock::new(None),
        })
    }

    /// A catalog that serves `counts` until the TTL runs out.
    #[cfg(test)]
    pub fn preloaded(source_url: impl Into<String>, counts: VerseCounts) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(source_url)?;
        catalog.cached = RwLock::new(Some(Cached {
            fetched_at: Instant::now(),
            counts: Arc::new(counts),
        }));
        Ok(catalog)
    }

    pub async fn get(&self) -> Result<Arc<VerseCounts>, CatalogError> {
        {
            let cached = self.cached.read().await;
            if let Some(fresh) = self.fresh(&cached) {
                return Ok(fresh);
            }
        }

        let mut slot = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(fresh) = self.fresh(&slot) {
            return Ok(fresh);
        }

        match self.fetch().await {
            Ok(counts) => {
                info!(books = counts.len(), "Verse counts refreshed");
                let counts = Arc::new(counts);
                *slot = Some(Cached {
                    fetched_at: Instant::now(),
                    counts: counts.clone(),
                });
                Ok(counts)
            }
            Err(e) => match &*slot {
                Some(stale) => {
                    warn!(error = %e, "Verse count refresh failed, serving cached copy");
                    Ok(stale.counts.clone())
                }
                None => Err(e),
            },
        }
    }

    fn fresh(&self, cached: &Option<Cached>) -> Option<Arc<VerseCounts>> {
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.counts.clone())
    }

    async fn fetch(&self) -> Result<VerseCounts, CatalogError> {
        debug!(url = %self.source_url, "Fetching verse counts");
        let response = self
            .client
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| CatalogError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let books: Vec<SourceBook> = response
            .json()
            .await
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        parse_source(books)
    }
}

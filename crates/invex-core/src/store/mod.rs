//! Advisory pattern store.
//!
//! Records which vendor/strategy pairs have succeeded for a given
//! structural fingerprint so later parses can try the right specialized
//! parser first. The store is advisory only: it may reorder strategy
//! attempts but never overrides the validator or the reconciler.
//!
//! Concurrency: readers load the JSON document once per process and cache
//! it; the single writer holds a mutex and persists through a temp-file
//! rename. Writes are best-effort and may be dropped.

pub mod fingerprint;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::invoice::{Cents, ParseResult, VendorKey};

pub use fingerprint::{features, fingerprint};

const STORE_VERSION: u32 = 1;

/// One learned pattern for a vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternEntry {
    pub fingerprint: String,
    pub vendor: String,
    pub strategy: String,
    pub confidence: u8,
    pub item_count: usize,
    pub total_cents: Cents,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub success_count: u64,
    pub last_used: DateTime<Utc>,
}

/// Routing hint stored per fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintHit {
    pub vendor: String,
    pub strategy: String,
    pub confidence: u8,
}

impl FingerprintHit {
    /// The vendor this hit recommends trying first.
    pub fn vendor_key(&self) -> Option<VendorKey> {
        VendorKey::from_key(&self.vendor)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_parses: u64,
    pub successful_parses: u64,
    pub patterns_learned: u64,
}

/// The persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDocument {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub vendor_patterns: HashMap<String, Vec<PatternEntry>>,
    pub fingerprint_map: HashMap<String, FingerprintHit>,
    pub stats: StoreStats,
}

impl Default for PatternDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            last_updated: Utc::now(),
            vendor_patterns: HashMap::new(),
            fingerprint_map: HashMap::new(),
            stats: StoreStats::default(),
        }
    }
}

/// File-backed pattern store with an in-memory cache.
#[derive(Debug)]
pub struct PatternStore {
    path: PathBuf,
    document: Mutex<PatternDocument>,
}

impl PatternStore {
    /// Open a store at `path`, loading the existing document when present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let document: PatternDocument = serde_json::from_str(&content)?;
                if document.version != STORE_VERSION {
                    return Err(StoreError::UnsupportedVersion(document.version));
                }
                document
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PatternDocument::default(),
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.clone(),
                    source: e,
                })
            }
        };

        debug!(
            path = %path.display(),
            fingerprints = document.fingerprint_map.len(),
            "opened pattern store"
        );
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Routing hint for a fingerprint, if one was learned.
    pub fn recommend(&self, fingerprint: &str) -> Option<FingerprintHit> {
        let document = self.document.lock().ok()?;
        document.fingerprint_map.get(fingerprint).cloned()
    }

    /// Record the outcome of a parse. Persistence is atomic; failures are
    /// returned but callers treat them as best-effort.
    pub fn record(
        &self,
        fingerprint: &str,
        features: &[String],
        strategy: &str,
        result: &ParseResult,
    ) -> Result<(), StoreError> {
        let mut document = match self.document.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Utc::now();

        document.stats.total_parses += 1;
        if result.success {
            document.stats.successful_parses += 1;
        }

        if result.success && result.vendor_key.is_specific() {
            let vendor = result.vendor_key.as_str().to_string();
            let confidence = result.confidence.score;

            match document.fingerprint_map.get_mut(fingerprint) {
                Some(hit) => {
                    if confidence >= hit.confidence {
                        hit.vendor = vendor.clone();
                        hit.strategy = strategy.to_string();
                        hit.confidence = confidence;
                    }
                }
                None => {
                    document.fingerprint_map.insert(
                        fingerprint.to_string(),
                        FingerprintHit {
                            vendor: vendor.clone(),
                            strategy: strategy.to_string(),
                            confidence,
                        },
                    );
                    document.stats.patterns_learned += 1;
                }
            }

            let entries = document.vendor_patterns.entry(vendor.clone()).or_default();
            match entries.iter_mut().find(|e| e.fingerprint == fingerprint) {
                Some(entry) => {
                    entry.success_count += 1;
                    entry.last_used = now;
                    entry.confidence = confidence.max(entry.confidence);
                }
                None => entries.push(PatternEntry {
                    fingerprint: fingerprint.to_string(),
                    vendor,
                    strategy: strategy.to_string(),
                    confidence,
                    item_count: result.line_items.len(),
                    total_cents: result.totals.total_cents,
                    features: features.to_vec(),
                    created_at: now,
                    success_count: 1,
                    last_used: now,
                }),
            }
        }

        document.last_updated = now;
        self.persist(&document)
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> StoreStats {
        match self.document.lock() {
            Ok(guard) => guard.stats.clone(),
            Err(poisoned) => poisoned.into_inner().stats.clone(),
        }
    }

    fn persist(&self, document: &PatternDocument) -> Result<(), StoreError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let json = serde_json::to_string_pretty(document)?;
        let temp = NamedTempFile::new_in(parent).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(temp.path(), json).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        temp.persist(&self.path).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

/// Log-and-continue wrapper for best-effort writes.
pub fn record_best_effort(
    store: &PatternStore,
    fingerprint: &str,
    features: &[String],
    strategy: &str,
    result: &ParseResult,
) {
    if let Err(e) = store.record(fingerprint, features, strategy, result) {
        warn!(error = %e, "pattern store write dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::ParseFailure;
    use pretty_assertions::assert_eq;

    fn success_result(vendor: VendorKey, score: u8) -> ParseResult {
        let mut result = ParseResult::failure(ParseFailure::NoValidParse, "test");
        result.success = true;
        result.error = None;
        result.vendor_key = vendor;
        result.confidence.score = score;
        result
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::open(dir.path().join("patterns.json")).unwrap();
        assert_eq!(store.stats().total_parses, 0);
    }

    #[test]
    fn test_record_and_recommend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        let store = PatternStore::open(&path).unwrap();

        let result = success_result(VendorKey::Cintas, 90);
        let features = vec!["vendor:cintas".to_string(), "has:money".to_string()];
        store.record("abc123def456", &features, "cintas", &result).unwrap();

        let hit = store.recommend("abc123def456").unwrap();
        assert_eq!(hit.vendor_key(), Some(VendorKey::Cintas));
        assert_eq!(hit.strategy, "cintas");

        // Reload from disk: the write must have persisted atomically.
        let reloaded = PatternStore::open(&path).unwrap();
        assert!(reloaded.recommend("abc123def456").is_some());
        assert_eq!(reloaded.stats().total_parses, 1);
        assert_eq!(reloaded.stats().patterns_learned, 1);
    }

    #[test]
    fn test_generic_results_count_but_do_not_learn() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::open(dir.path().join("patterns.json")).unwrap();

        let result = success_result(VendorKey::Generic, 70);
        store.record("feedfacecafe", &[], "universal", &result).unwrap();

        assert!(store.recommend("feedfacecafe").is_none());
        assert_eq!(store.stats().total_parses, 1);
        assert_eq!(store.stats().patterns_learned, 0);
    }

    #[test]
    fn test_repeat_success_bumps_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = PatternStore::open(dir.path().join("patterns.json")).unwrap();

        let result = success_result(VendorKey::Sysco, 80);
        store.record("0011aabbccdd", &[], "sysco", &result).unwrap();
        store.record("0011aabbccdd", &[], "sysco", &result).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_parses, 2);
        assert_eq!(stats.patterns_learned, 1);

        let guard = store.document.lock().unwrap();
        let entries = guard.vendor_patterns.get("sysco").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].success_count, 2);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(
            &path,
            r#"{"version": 99, "lastUpdated": "2024-01-01T00:00:00Z", "vendorPatterns": {}, "fingerprintMap": {}, "stats": {"totalParses": 0, "successfulParses": 0, "patternsLearned": 0}}"#,
        )
        .unwrap();
        assert!(matches!(
            PatternStore::open(&path),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }
}

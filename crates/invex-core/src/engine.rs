//! Pipeline orchestration.
//!
//! One `parse` call runs the full pipeline: normalize, score quality,
//! detect the vendor, extract totals and adjustments, run every strategy,
//! validate and choose, filter garbage, reconcile, emit. Single-threaded,
//! no I/O on the parse path, re-entrant; the only shared mutable state is
//! the optional pattern store behind its own lock.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::filter::filter_items;
use crate::models::config::{EngineConfig, ParseOptions};
use crate::models::invoice::{
    DebugReport, ParseFailure, ParseResult, TotalCandidateEvidence, VendorIdentity, VendorKey,
};
use crate::reconcile::{detect_currency, reconcile};
use crate::rules::adjustments::extract_adjustments;
use crate::rules::header::extract_header;
use crate::rules::layout::detect_table;
use crate::rules::totals::extract_totals;
use crate::store::{self, PatternStore};
use crate::strategies::{
    CintasParser, DelimitedParser, HeaderGuidedParser, HeuristicParser, ParseCandidate,
    ParseContext, ParseStrategy, PriceAnchoredParser, SyscoParser, UniversalPatternParser,
    UsFoodsParser,
};
use crate::text::{normalize, QualityBucket, TextQualityAnalyzer};
use crate::validate::choose;
use crate::vendor::detect_vendor;

/// Version stamp carried in every result envelope.
pub const PARSER_VERSION: &str = concat!("invex-core/", env!("CARGO_PKG_VERSION"));

/// The parsing engine. Cheap to construct; construct once and share when a
/// pattern store is configured.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    pattern_store: Option<PatternStore>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from configuration, opening the pattern store when
    /// one is configured.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let pattern_store = match &config.pattern_store_path {
            Some(path) => Some(PatternStore::open(path)?),
            None => None,
        };
        Ok(Self {
            config,
            pattern_store,
        })
    }

    /// Parse one invoice. Never fails; terminal problems come back in the
    /// envelope.
    pub fn parse(&self, raw: &str, options: &ParseOptions) -> ParseResult {
        if raw.trim().is_empty() {
            info!("empty input");
            return ParseResult::failure(ParseFailure::EmptyInput, PARSER_VERSION);
        }

        let mut text = normalize(raw);
        let analyzer = TextQualityAnalyzer::new();
        let mut quality = analyzer.analyze(&text);
        if quality.bucket == QualityBucket::Poor && options.aggressive_clean {
            debug!(score = quality.score, "poor text, applying aggressive clean");
            text = analyzer.aggressive_clean(&text);
            quality = analyzer.analyze(&text);
        }

        let vendor = self.resolve_vendor(&text, options);
        let merged = analyzer.merge_split_items(&text);
        let totals = extract_totals(&text);
        let adjustments = extract_adjustments(&text);
        let header = extract_header(&text);
        let layout = detect_table(&text);

        let features = store::features(&text);
        let fingerprint = store::fingerprint(&features);
        let recommended = self
            .pattern_store
            .as_ref()
            .and_then(|s| s.recommend(&fingerprint))
            .and_then(|hit| hit.vendor_key())
            .filter(|k| k.is_specific());

        let ctx = ParseContext {
            text: &text,
            merged: &merged,
            vendor: &vendor,
            header: &header,
            layout: layout.as_ref(),
            totals: &totals,
            adjustments: &adjustments,
        };

        let mut candidates: Vec<ParseCandidate> = Vec::new();
        for (rank, strategy) in self.strategy_order(&vendor, recommended, options).iter().enumerate() {
            match strategy.run(&ctx) {
                Some(mut candidate) => {
                    candidate.strategy_rank = rank;
                    debug!(
                        strategy = candidate.strategy,
                        items = candidate.items.len(),
                        confidence = candidate.confidence,
                        "candidate produced"
                    );
                    candidates.push(candidate);
                }
                None => debug!(strategy = strategy.name(), "no candidate"),
            }
        }

        let Some((mut winner, mut report, alternatives)) = choose(candidates, &vendor) else {
            info!("no strategy produced a usable candidate");
            let mut result = ParseResult::failure(ParseFailure::NoValidParse, PARSER_VERSION);
            if options.debug {
                result.debug = Some(DebugReport {
                    original_text: raw.to_string(),
                    text_quality: quality.score,
                    quality_bucket: quality.bucket.as_str().to_string(),
                    vendor_detection: Some(vendor),
                    fingerprint: Some(fingerprint),
                    total_candidates: totals_evidence(&totals),
                    ..DebugReport::default()
                });
            }
            return result;
        };

        // Garbage filter, then reconciliation: the reconciler must close the
        // arithmetic over the rows that will actually be emitted.
        let printed_hint = winner.printed_total_cents;
        let (kept, removed) = filter_items(std::mem::take(&mut winner.items), printed_hint);
        winner.items = kept;

        let currency = detect_currency(&text.normalized);
        let outcome = reconcile(&mut winner, &totals, currency);
        report.warnings.extend(outcome.warnings.clone());
        if !removed.is_empty() {
            report
                .warnings
                .push(format!("{} rows removed by the garbage filter", removed.len()));
        }

        for (index, adjustment) in winner.adjustments.iter_mut().enumerate() {
            adjustment.adjustment_number = index as u32 + 1;
        }

        let (vendor_key, vendor_name) = if winner.is_vendor_specific() {
            (winner.vendor, winner.vendor.display_name().to_string())
        } else {
            (vendor.key, vendor.display_name.clone())
        };

        let mut result = ParseResult {
            success: true,
            error: None,
            vendor_key,
            vendor_name,
            parser_version: PARSER_VERSION.to_string(),
            header: winner.header,
            totals: outcome.totals,
            adjustments: winner.adjustments,
            line_items: winner.items,
            confidence: report,
            debug: None,
        };

        if options.debug {
            result.debug = Some(DebugReport {
                original_text: raw.to_string(),
                text_quality: quality.score,
                quality_bucket: quality.bucket.as_str().to_string(),
                vendor_detection: Some(vendor),
                candidates: alternatives,
                total_candidates: totals_evidence(&totals),
                reconciliation: outcome.trace,
                filtered_items: removed,
                fingerprint: Some(fingerprint.clone()),
            });
        }

        if let Some(store) = &self.pattern_store {
            store::record_best_effort(store, &fingerprint, &features, winner.strategy, &result);
        }

        info!(
            vendor = result.vendor_key.as_str(),
            items = result.line_items.len(),
            total = result.totals.total_cents,
            score = result.confidence.score,
            "parse complete"
        );
        result
    }

    /// Resolve the vendor: an explicit hint bypasses detection.
    fn resolve_vendor(&self, text: &crate::text::InvoiceText, options: &ParseOptions) -> VendorIdentity {
        let hint = options
            .vendor_hint
            .as_deref()
            .or(self.config.defaults.vendor_hint.as_deref());
        if let Some(hint) = hint {
            match VendorKey::from_key(hint) {
                Some(key) if key.is_specific() => return VendorIdentity::new(key, 100),
                _ => warn!(hint, "unrecognized vendor hint, falling back to detection"),
            }
        }
        detect_vendor(text)
    }

    /// Strategy attempt order: the preferred vendor parser first, the other
    /// vendor parsers next, generic fallbacks last. Strict mode runs only
    /// the preferred vendor parser.
    fn strategy_order(
        &self,
        vendor: &VendorIdentity,
        recommended: Option<VendorKey>,
        options: &ParseOptions,
    ) -> Vec<Box<dyn ParseStrategy>> {
        let mut vendor_keys: Vec<VendorKey> = Vec::new();
        let push_key = |keys: &mut Vec<VendorKey>, key: VendorKey| {
            if key.is_specific() && !keys.contains(&key) {
                keys.push(key);
            }
        };

        if let Some(key) = recommended {
            push_key(&mut vendor_keys, key);
        }
        push_key(&mut vendor_keys, vendor.key);

        if options.strict {
            return vendor_keys.into_iter().map(vendor_parser).collect();
        }

        for key in [VendorKey::Cintas, VendorKey::Sysco, VendorKey::Usfoods] {
            push_key(&mut vendor_keys, key);
        }

        let mut strategies: Vec<Box<dyn ParseStrategy>> =
            vendor_keys.into_iter().map(vendor_parser).collect();
        strategies.push(Box::new(HeaderGuidedParser));
        strategies.push(Box::new(PriceAnchoredParser));
        strategies.push(Box::new(UniversalPatternParser));
        strategies.push(Box::new(DelimitedParser));
        strategies.push(Box::new(HeuristicParser));
        strategies
    }
}

fn vendor_parser(key: VendorKey) -> Box<dyn ParseStrategy> {
    match key {
        VendorKey::Sysco => Box::new(SyscoParser),
        VendorKey::Usfoods => Box::new(UsFoodsParser),
        _ => Box::new(CintasParser),
    }
}

fn totals_evidence(totals: &crate::rules::totals::TotalsEvidence) -> Vec<TotalCandidateEvidence> {
    totals
        .candidates
        .iter()
        .map(|c| TotalCandidateEvidence {
            label: c.label.as_str().to_string(),
            value_cents: c.value_cents,
            priority: c.priority,
            layout: c.layout.as_str().to_string(),
            context: c.context.clone(),
        })
        .collect()
}

/// Parse with a throwaway engine and no pattern store.
pub fn parse(raw: &str, options: &ParseOptions) -> ParseResult {
    Engine::new().parse(raw, options)
}

//! Core library for supplier invoice parsing and reconciliation.
//!
//! This crate takes the raw text of an invoice (from OCR or a native PDF
//! extractor) and produces a structured, financially reconciled record:
//! header metadata, line items, adjustments, and an authoritative total
//! with a confidence breakdown.
//!
//! The pipeline:
//! - text normalization and quality scoring (OCR damage repair)
//! - vendor detection against known layout signatures
//! - competing parser strategies (vendor-specific and generic)
//! - priority-ordered totals extraction and adjustment vocabulary
//! - weighted validation, printed-total reconciliation, garbage filtering
//!
//! ```
//! use invex_core::{parse, ParseOptions};
//!
//! let result = parse(
//!     "C 13 UNIFORM PANTS 4.50 58.50\nSUBTOTAL 58.50\nSALES TAX 3.51\nTOTAL USD 62.01",
//!     &ParseOptions::default(),
//! );
//! assert!(result.success);
//! assert_eq!(result.totals.total_cents, 6201);
//! ```

pub mod engine;
pub mod error;
pub mod filter;
pub mod models;
pub mod reconcile;
pub mod rules;
pub mod store;
pub mod strategies;
pub mod text;
pub mod validate;
pub mod vendor;

pub use engine::{parse, Engine, PARSER_VERSION};
pub use error::{InvexError, Result, StoreError};
pub use models::config::{EngineConfig, ParseOptions};
pub use models::invoice::{
    Adjustment, AdjustmentKind, Cents, InvoiceHeader, LineItem, ParseFailure, ParseResult, Totals,
    UnitPrice, ValidationReport, VendorIdentity, VendorKey,
};
pub use store::PatternStore;
pub use text::{normalize, InvoiceText};

//! Data models for parsed invoices and engine configuration.

pub mod config;
pub mod invoice;

pub use config::{EngineConfig, ParseOptions};
pub use invoice::{
    Adjustment, AdjustmentKind, Cents, InvoiceHeader, LineItem, ParseFailure, ParseResult, Totals,
    UnitPrice, ValidationReport, VendorIdentity, VendorKey,
};

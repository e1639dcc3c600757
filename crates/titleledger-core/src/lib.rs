//! # titleledger-core
//!
//! State-transition logic for a vehicle title registry kept in an external
//! key-value ledger - THE REGISTRY.
//!
//! Each title is a record stored at its id. A secondary index, stored at a
//! reserved key, lists every known id in insertion order. The registry
//! validates and normalizes requests, encodes records, and keeps the index
//! in step with creations and deletions.
//!
//! ## Layers
//!
//! ```text
//!   dispatcher (CLI / HTTP)
//!        │  operation name + string args
//!        ▼
//!   dispatch ──► registry ──► codec
//!                   │
//!                   ▼
//!             LedgerStore (memory | redb)
//! ```
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - The ledger offers single-key atomicity only; the registry never assumes
//!   more, and reports partially applied operations as such
//! - Every read-modify-write goes through a versioned compare-and-swap

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod dispatch;
pub mod primitives;
pub mod registry;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{CreatePolicy, LedgerError, Versioned};

pub use codec::{TitleRecord, decode_index, decode_record, encode_index, encode_record};
pub use dispatch::Operation;
pub use registry::{AuditReport, Registry, RegistryConfig};
pub use storage::{LedgerStore, MemoryLedger, RedbLedger};

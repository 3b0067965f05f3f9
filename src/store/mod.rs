//! Live configuration store.
//!
//! # Data Flow
//! ```text
//! bootstrap / UpdatePlanner::commit / ReloadCoordinator
//!     → SectionStore::apply (sorted write locks, pointer assignment)
//!
//! RPC readers, dry runs, consuming subsystems
//!     → SectionStore::get (sorted read locks, Arc clones)
//!
//! consuming subsystems
//!     → SectionStore::subscribe (one broadcast channel per section)
//! ```
//!
//! # Design Decisions
//! - Readers never mutate; writers never do I/O under a lock
//! - Disjoint section sets proceed in parallel
//! - Same-section writers are linearized, last writer wins

pub mod section_store;

pub use section_store::{SectionChange, SectionStore, Snapshot};

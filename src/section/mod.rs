//! Section model: the pluggable unit of configuration.
//!
//! # Data Flow
//! ```text
//! subsystem struct (serde + Section)
//!     → registry.rs (type erased behind SectionCodec, field names recorded)
//!     → value.rs (payload leaves as FieldValue)
//!     → merge.rs (overlay onto current value, coerce, strict decode, validate)
//!     → SharedValue stored by the SectionStore
//! ```
//!
//! # Design Decisions
//! - The store never knows a section's concrete type
//! - Every field is serialized so unknown payload fields can be detected
//! - Validation runs on the fully merged value, never on fragments

pub mod builtin;
pub mod merge;
pub mod registry;
pub mod schema;
pub mod value;

pub use merge::{overlay_value, patch_from_json, SectionPatch};
pub use registry::{is_all, SanityCheck, SectionEntry, SectionRegistry, ALL_SECTIONS};
pub use schema::{downcast, Section, SectionCodec, SectionValue, SharedValue, TypedCodec};
pub use value::FieldValue;

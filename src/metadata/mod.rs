//! Canonical metadata: the persisted model, how it is reconciled from scans,
//! and the live row pass that reads against it.

pub mod reconciler;
pub mod rows;
pub mod store;
pub mod types;

pub use types::{
    ActionDescriptor, ActionType, ColumnDescriptor, FilterDescriptor, Metadata, TableDescriptor,
};

//! UI5 page introspection: identifier conventions, in-page scripts, the
//! registry scanner and readiness predicates.

pub mod column_dialog;
pub mod control;
pub mod ids;
pub mod readiness;
pub mod scanner;
pub mod scripts;

pub use control::{Control, ControlRole};
pub use scanner::{scan, ScanOptions, ScanResult};

//! Root-level property-based tests.
//!
//! Each sub-module checks one component against generated inputs using
//! proptest.

mod deleter_properties;
mod logging_properties;
mod parser_properties;
mod retention_properties;

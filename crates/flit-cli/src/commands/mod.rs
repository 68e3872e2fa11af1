//! CLI command implementations

pub(crate) mod migrate;
pub(crate) mod new;

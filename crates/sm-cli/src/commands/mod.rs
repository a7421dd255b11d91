//! CLI command implementations

pub(crate) mod common;
pub(crate) mod status;
pub(crate) mod strip;
pub(crate) mod up;

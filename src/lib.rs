//! geonav library exports for testing

pub mod core;
pub mod runtime;
pub mod search;
pub mod surface;

#[cfg(test)]
pub mod test_support;

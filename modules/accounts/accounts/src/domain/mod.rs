pub mod error;
pub mod guard;
pub mod identity;
pub mod ports;
pub mod service;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod service_test;

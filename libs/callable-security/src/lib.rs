#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod context;
pub mod secret_string;

pub use context::{AuthInfo, CallContext, CallContextBuilder};
pub use secret_string::SecretString;

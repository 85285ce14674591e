pub mod clock;
pub mod error;
pub mod geo;
pub mod meter;
pub mod position;
pub mod pricing;
pub mod replay;
pub mod runner;
pub mod session;
pub mod tariff;
pub mod tracker;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

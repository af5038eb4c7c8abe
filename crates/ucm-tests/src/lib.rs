//! Integration test crate for the UCM routing resolver.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives `ucm-router` over catalogs built by `ucm-catalog` and a
//! simulated `ucm-mixer` transport.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod routing;

#[cfg(test)]
mod calibration;

#[cfg(test)]
mod catalog;

#[cfg(test)]
mod endpoint;

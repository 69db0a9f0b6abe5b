//! Integration tests for the mms pipeline.
//!
//! These tests run whole reconciliation passes against in-memory chain state:
//! - Static market map and perpetuals sources
//! - Fixed gas estimator and keyless signer
//! - Scripted broadcast client

pub mod common;

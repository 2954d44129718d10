//! Tripmate - Trip Planning Assistant API
//!
//! This crate implements a stateless HTTP surface that relays streaming
//! chat turns to a generative AI provider and persists conversation rows
//! in a hosted table store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

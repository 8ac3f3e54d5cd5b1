//! # Tarkib Support
//!
//! Shared utilities for the Tarkib IoC container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Graph rendering (DOT) and instantiation plans

pub mod rendering;

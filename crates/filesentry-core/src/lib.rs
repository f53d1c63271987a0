//! # filesentry-core
//!
//! Core type system for filesentry -- a filesystem activity monitor built on
//! the OS security-event layer.
//!
//! This crate defines the shared types used across the sensor and the daemon:
//! the normalized event model, the IPC protocol spoken to the downstream
//! consumer, configuration, and diagnostic rate limiting.

pub mod config;
pub mod event;
pub mod ipc;
pub mod rate_limit;

//! Nuzlocke Navigator Library
//!
//! This module exposes the session, data clients and CLI definitions for the
//! `nuzlocke` binary and for integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod detail;
pub mod markup;
pub mod prefetch;
pub mod report;
pub mod team;

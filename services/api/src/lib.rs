//! PR reviewer assignment service.
//!
//! Teams of users review each other's pull requests. Creating a pull request
//! assigns up to two active teammates of the author; a reviewer can later be
//! swapped for another active member of their team. The crate ships the
//! `pr-reviewer-api` binary and exposes its internals for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod model;
pub mod service;
pub mod state;
pub mod store;

//! Reconcile Slack user profiles against a desired-state CSV and notify the
//! users whose profiles changed.

pub mod config;
pub mod input;
pub mod maintainer;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod slack;
pub mod summary;

//! timetable-sync: harvest, fingerprint and catalog published schedule files.
//!
//! A pass crawls the schedule site, downloads every listed file, classifies
//! it into a canonical resource, and records a new version only when the
//! file's content fingerprint changed. Resources that disappear from the site
//! are deprecated, never deleted.

pub mod classify;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod fingerprint;
pub mod models;
pub mod repository;
pub mod schema;
pub mod services;
pub mod storage;

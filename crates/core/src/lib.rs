//! Domain model and client-side rules for the educational catalog admin.
//!
//! Everything here is synchronous and free of I/O so it can be shared by
//! the HTTP client, the command-line front end and tests alike.

pub mod bundle;
pub mod error;
pub mod export;
pub mod filter;
pub mod form;
pub mod ordering;
pub mod row;
pub mod scope;
pub mod search;
pub mod stats;
pub mod subject_service;
pub mod types;
pub mod validation;
pub mod voucher;

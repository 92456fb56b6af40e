//! Command-line front end of the catalog admin client.
//!
//! [`args::parse`] turns the command line into a [`args::Command`];
//! [`commands::App::run`] drives the matching screen of
//! `eduadmin-client` and prints the result.

pub mod args;
pub mod commands;

//! REST client and screen controllers for the educational catalog admin.
//!
//! [`api::ApiClient`] talks to the backend; the screen types in
//! [`screens`] and [`assignment`] hold what each admin view shows and
//! enforce the client-side rules before anything is sent.

pub mod api;
pub mod assignment;
pub mod collection;
pub mod config;
pub mod debounce;
pub mod error;
pub mod scope;
pub mod screens;
pub mod selector;
pub mod session;
pub mod storage;

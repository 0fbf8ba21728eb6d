//! Demo application around the `navigation` crate: a signed-out and a
//! signed-in domain, a session-driven root and a line-based UI loop.

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod routes;
pub mod runner;
pub mod session;
pub mod shell;

pub use routes::{Authorized, DeepLink, Screen, Unauthorized};
pub use runner::{LinkSender, Runner};
pub use shell::{AppShell, AppState};

pub mod config;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod samples;
pub mod server;


pub use guard::{check, GuardResult, PathGuard, Reason, ResolvedPath, TrustedRoot};

//! Facade crate: one import surface over the core types and the local
//! adapter implementations.
//!
//! ```no_run
//! use reachpipe::Reach;
//!
//! # async fn demo() -> reachpipe::Result<()> {
//! let reach = Reach::new();
//! let page = reach.read("https://github.com/rust-lang/rust").await?;
//! println!("{}", page.title);
//! # Ok(())
//! # }
//! ```

pub use reachpipe_core::{
    Adapter, Config, Error, HealthSignals, HealthStatus, ReadResult, Registry, Result,
    SearchResult, Signal, Tier, WARNING_MARKER,
};
pub use reachpipe_local::doctor::{check_all, format_report, AdapterHealth};
pub use reachpipe_local::{builtin_registry, default_client, Reach};

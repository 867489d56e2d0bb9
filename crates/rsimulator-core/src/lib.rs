//! Request/response simulation by template matching.
//!
//! A template directory holds pairs of `<name>Request.<ext>` and
//! `<name>Response.<ext>` files. An incoming request is matched against every
//! request template of its content type; templates may embed regular
//! expressions, and the captured groups are substituted into the paired
//! response as `${1}`, `${2}`, ...
//!
//! ```no_run
//! use rsimulator_core::Simulator;
//!
//! let simulator = Simulator::builder("./templates").build();
//! if let Some(reply) = simulator.service("json", r#"{"foo": "Hello"}"#, "json")? {
//!     println!("{}", reply.body);
//! }
//! # Ok::<(), rsimulator_core::CoreError>(())
//! ```

// ===== Matching engine =====
pub mod matcher;
pub mod pattern;
mod result;

// ===== Lookup =====
mod cache;
mod error;
mod finder;
mod hooks;
mod service;
pub mod template;

pub use cache::{CacheMetrics, LookupCache, DEFAULT_MAX_ENTRIES};
pub use error::CoreError;
pub use finder::{find_matches, response_path, Match, Matches, NoMatch};
pub use hooks::{Hooks, NoHooks};
pub use matcher::{matcher_for, ContentType, Matcher};
pub use result::{Groups, MatchResult, Mismatch, PathSegment};
pub use service::{Lookup, Reply, Simulator, SimulatorBuilder};

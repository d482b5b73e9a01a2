//! Shared test utilities for lualint crates.
//!
//! - [`builders`]: terse constructors for located syntax trees
//! - [`assertions`]: stable text renderings for insta snapshots
//! - [`tracking`]: a shared log for observing listener calls

pub mod assertions;
pub mod builders;
pub mod tracking;

pub use assertions::{format_issues, format_messages};
pub use builders::{
    binop, block, call, forin, id, local, number, pos, span, string, tree,
};
pub use tracking::CallLog;

/// Built-in lint rules
///
/// Each rule lives in its own file and implements [`crate::Rule`]. Rules
/// keep per-file state inside the closures of the listener map they return.
mod max_nesting_depth;
mod no_empty_block;
mod prefer_generalized_iteration;

pub use max_nesting_depth::{MaxNestingDepthOptions, MaxNestingDepthRuleImpl};
pub use no_empty_block::NoEmptyBlockRuleImpl;
pub use prefer_generalized_iteration::PreferGeneralizedIterationRuleImpl;

pub mod common;
pub mod fix;
pub mod lint;
pub mod rules;

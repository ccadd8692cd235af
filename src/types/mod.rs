// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Stack names are the identity of every graph node.

mod stack_name;

pub use stack_name::{MAX_STACK_NAME_LEN, StackName, StackNameError};

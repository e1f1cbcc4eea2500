//! Machine module - executor implementation
//!
//! The executor is segmented into focused submodules: the machine struct
//! and host entry points, call frames, operand-stack ops, control flow,
//! and comp arithmetic.

mod arith;
mod control;
mod frame;
mod stack;
mod vm;

// Public API
pub use frame::Frame;
pub use vm::{Machine, FRAMES_MAX, STACK_MAX};

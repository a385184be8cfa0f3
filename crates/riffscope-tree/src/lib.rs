#![warn(clippy::pedantic)]

pub mod fmt;
pub mod node;

pub use node::{Node, NodeBody, Scalar, Value};

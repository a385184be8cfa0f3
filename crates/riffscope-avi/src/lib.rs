#![warn(clippy::pedantic)]

pub mod codec;
mod decoder;
pub mod error;
mod headers;
mod index;
mod streams;
pub mod tag;
pub mod walk;

pub use codec::{CodecRef, CodecSet};
pub use decoder::{Dissection, Options, decode};
pub use error::AviError;
pub use index::IndexSource;
pub use streams::{BitRange, StreamSummary};

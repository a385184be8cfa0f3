#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod mapper;
pub mod scan;

pub use codec::SampleCodec;
pub use error::ScanError;
pub use mapper::{Mapper, StrDescs, UintSyms};
pub use scan::Scan;

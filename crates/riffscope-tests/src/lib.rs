//! Shared fixture assembly for the riffscope integration suite.

pub mod fixture;

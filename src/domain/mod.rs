//! Core records and validation shared by the write and read paths.

pub mod entities;
pub mod error;
pub mod votes;

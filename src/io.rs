//! Record input and compressed I/O.

pub mod compression;
pub mod input;

#![forbid(unsafe_code)]

pub mod filter;
pub mod model;
pub mod stats;
pub mod storage;
pub mod team;

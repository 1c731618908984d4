#![doc = include_str!("../README.md")]

pub mod cli;
pub mod dates;
pub mod engine;
pub mod error;
pub mod extract;
pub mod paginate;
pub mod pipeline;
pub mod services;
pub mod slug;
pub mod sources;
pub mod types;
pub mod urls;

pub use engine::*;
pub use error::*;
pub use types::*;

pub mod export;
pub mod fetch;

pub use export::*;
pub use fetch::*;

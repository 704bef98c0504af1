pub mod loader;
pub mod report;

pub use loader::*;
pub use report::*;

pub mod builder;
pub mod cascade;
pub mod stage;
pub mod traits;
pub mod types;

pub use builder::*;
pub use cascade::*;
pub use stage::*;
pub use traits::*;
pub use types::*;

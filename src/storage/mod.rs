pub mod local;
pub mod location;
pub mod provider;

pub use local::*;
pub use location::*;
pub use provider::*;

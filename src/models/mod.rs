pub mod file;
pub mod oauth;

pub use file::*;
pub use oauth::*;

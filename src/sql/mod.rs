//! Safe SQL builder: identifiers from config or validated request keys, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;

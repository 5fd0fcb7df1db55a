pub mod resolved;

pub use resolved::ResolvedRoute;

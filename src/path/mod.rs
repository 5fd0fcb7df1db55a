//! Path-to-entity resolution: segmenting, naming convention and route resolution.

pub mod classify;
pub mod naming;
pub mod resolver;
pub mod segments;

pub use classify::{classify, PathShape};
pub use naming::{build_type, parse_main, EntityTypeRef, MainPath, ENTITY_TYPE_SUFFIX};
pub use resolver::{EntityLookup, MainResolution, RelationResolution, ResolvedPath, RouteResolver};
pub use segments::{is_numeric, parse_id, PathSegments};

//! HTTP handlers for resolved entity paths and registry introspection.

pub mod entity;
pub mod meta;
pub use entity::{delete_path, get_path, patch_path, post_path, put_path};

//! Row operations and request validation on top of the SQL builder.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::RequestValidator;

//! Loading and checking card content from JSON.

pub mod load;
pub mod schema;
pub mod validate;

pub use load::*;
pub use schema::*;
pub use validate::*;

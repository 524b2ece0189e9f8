//! Card-effect language and board logic. Keep this crate free of IO.

pub mod bidir;
pub mod cards;
pub mod classify;
pub mod config;
pub mod content;
pub mod eval;
pub mod filter;
pub mod logic;
pub mod parser;
pub mod rng;
pub mod stack;

pub use bidir::*;
pub use cards::*;
pub use classify::*;
pub use config::*;
pub use content::*;
pub use eval::*;
pub use filter::*;
pub use logic::*;
pub use parser::*;
pub use rng::*;
pub use stack::*;

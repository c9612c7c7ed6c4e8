// Candidate handlers module

mod candidates;
mod import;
mod interviews;

pub use candidates::*;
pub use import::*;
pub use interviews::*;

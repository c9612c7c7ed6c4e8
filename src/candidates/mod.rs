// Candidates module - records, review workflow, interviews, bulk import

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::candidates_routes;

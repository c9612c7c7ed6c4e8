// Services module

pub mod photos;

pub use photos::PhotoStore;

pub mod languages;
pub mod types;

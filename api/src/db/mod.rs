pub mod models;
pub mod queries;
pub mod repository;

#[cfg(test)]
pub mod memory;

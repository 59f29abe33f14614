pub mod grading;
pub mod ranking;
pub mod render;
pub mod report;

#[cfg(test)]
pub mod fixtures;

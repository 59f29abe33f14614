pub mod grades;
pub mod health;
pub mod reports;
pub mod subjects;

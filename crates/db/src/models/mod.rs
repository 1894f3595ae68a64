pub mod affirmation;
pub mod problem;
pub mod problem_category;
pub mod session;
pub mod user;

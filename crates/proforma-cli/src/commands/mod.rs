pub mod analyze;
pub mod sensitivity;
pub mod tools;

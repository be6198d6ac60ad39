//! Server-side business logic.

pub mod tools;

pub mod config;
pub mod flashcards;
pub mod model;
pub mod sessions;

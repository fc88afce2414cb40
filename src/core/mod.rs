pub mod character;
pub mod config;
pub mod dice;
pub mod engine;
pub mod names;
pub mod outcome;
pub mod sanity;
pub mod template;

pub mod character;
pub mod tables;
pub mod value;

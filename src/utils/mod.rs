pub mod cache;
pub mod error;
pub mod flash;
pub mod serializer;

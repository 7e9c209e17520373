pub mod keys;
pub mod stories;

pub mod fixture;
pub mod migrate;
pub mod token;

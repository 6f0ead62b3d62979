pub mod connection;
pub mod fingerprints;
pub mod rows;
pub mod seed;

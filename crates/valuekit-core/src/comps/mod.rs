pub mod bands;
pub mod scoring;
pub mod statistics;

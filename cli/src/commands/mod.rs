pub mod clean;
pub mod vectorize;

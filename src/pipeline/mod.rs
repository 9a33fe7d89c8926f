pub mod extraction;
pub mod prediction;

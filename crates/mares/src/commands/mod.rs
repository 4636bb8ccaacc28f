pub mod generate;
pub mod serve;

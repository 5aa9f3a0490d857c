pub mod providers;
pub mod respond;
pub mod retrieve;

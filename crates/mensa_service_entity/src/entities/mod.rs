pub mod prelude;

pub mod dish;
pub mod mensa;
pub mod review;

pub mod climate;
pub mod forecast;
pub mod hazards;
pub mod patterns;
pub mod storms;

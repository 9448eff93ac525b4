pub mod hub;
pub mod socket;

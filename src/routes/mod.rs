pub mod application_routes;
pub mod health;
pub mod interview_routes;
pub mod message_routes;

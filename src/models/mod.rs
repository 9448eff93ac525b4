pub mod application;
pub mod conversation;
pub mod interview;
pub mod job;
pub mod message;
pub mod user;

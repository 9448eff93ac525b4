pub mod application_service;
pub mod conversation_service;
pub mod email_service;
pub mod interview_service;
pub mod message_service;
pub mod rtc_service;

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use crate::realtime::hub::RealtimeHub;
use crate::services::{
    application_service::ApplicationService, conversation_service::ConversationService,
    email_service::EmailService, interview_service::InterviewService,
    message_service::MessageService, rtc_service::RtcService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub application_service: ApplicationService,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
    pub interview_service: InterviewService,
    pub hub: Arc<RealtimeHub>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let email_service = EmailService::new(
            http_client,
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        );
        let rtc_service = RtcService::new(
            config.rtc_app_id.clone(),
            config.rtc_app_certificate.clone(),
        );
        let conversation_service = ConversationService::new(pool.clone());
        let message_service = MessageService::new(pool.clone());
        let application_service = ApplicationService::new(
            pool.clone(),
            conversation_service.clone(),
            email_service.clone(),
        );
        let interview_service = InterviewService::new(pool.clone(), rtc_service, email_service);

        Self {
            pool,
            application_service,
            conversation_service,
            message_service,
            interview_service,
            hub: Arc::new(RealtimeHub::new()),
        }
    }
}

pub mod email_templates;

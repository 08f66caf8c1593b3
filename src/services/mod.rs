pub mod auth;
pub mod bootstrap_admin;
pub mod cache;
pub mod car;
pub mod chatbot;
pub mod email;
pub mod report;
pub mod report_worker;
pub mod review;
pub mod user;

pub mod ats;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod notify;
pub mod phone;
pub mod twilio;

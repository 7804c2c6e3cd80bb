pub mod auth;
pub mod credential;
pub mod telegram;

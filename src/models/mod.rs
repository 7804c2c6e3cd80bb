pub mod health;
pub mod identity;
pub mod session;
pub mod user;

pub mod api;
pub mod phone;
pub mod platform;
pub mod session;
pub mod validation;
pub mod wizard;

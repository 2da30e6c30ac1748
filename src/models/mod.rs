pub mod booking;
pub mod business;
pub mod slot;
pub mod wizard;

pub use booking::{BookingDraft, BookingRequest, BookingResult, BookingStatus, ContactForm};
pub use business::{Business, BusinessHours, Service, Staff};
pub use slot::{Slot, SlotKey};
pub use wizard::WizardStage;

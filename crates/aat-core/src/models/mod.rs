//! Data models for AAT sync

mod booking;
mod entity;
mod service;
mod user;

pub use booking::{Booking, BookingStatus, PaymentStatus, PaymentType};
pub use entity::{Collection, Entity};
pub use service::Service;
pub use user::{User, UserRole};

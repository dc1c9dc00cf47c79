//! Booking model

use serde::{Deserialize, Serialize};

/// Lifecycle of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

/// Payment progress of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
}

/// How a booking was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Card,
    BankTransfer,
    MobileMoney,
    Other,
}

/// A tour or transport booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub guest_name: String,
    #[serde(default)]
    pub guest_email: String,
    #[serde(default)]
    pub guest_phone: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub service_name: String,
    /// Calendar date of the booking (`YYYY-MM-DD`)
    pub booking_date: String,
    #[serde(default)]
    pub booking_time: String,
    /// Duration in minutes
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub deposit_amount: f64,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
    /// ID of the user who created the booking
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub qr_code_data: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
}

impl Booking {
    /// Amount still owed after the deposit, never negative
    #[must_use]
    pub fn balance_due(&self) -> f64 {
        (self.total_amount - self.deposit_amount).max(0.0)
    }
}

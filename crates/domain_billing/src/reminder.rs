//! Payment reminders

use core_kernel::Money;

use crate::ports::OutboundMessage;
use crate::roster::Student;

/// Builds the reminder sent to a student who owes `amount`
///
/// The recipient is the student's phone number with everything but digits
/// removed.
pub fn compose_reminder(student: &Student, amount: Money, currency_label: &str) -> OutboundMessage {
    OutboundMessage {
        recipient: student.phone_digits(),
        body: format!(
            "Dear {}, you have a pending payment of {} {}. Please pay at your earliest convenience. Thank you!",
            student.name, currency_label, amount
        ),
    }
}

//! Outbound message composition.
//!
//! Pure template logic only — delivery lives behind the server's `Notifier`.
//! All messages are best-effort: nothing in the booking lifecycle depends on
//! one being delivered.

use serde::Deserialize;

/// What a staff-to-client message is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffMessageKind {
  Cancel,
  Reschedule,
  Remind,
  Custom,
}

/// Context for composing a staff-to-client message about one session.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffMessage {
  pub kind:       StaffMessageKind,
  pub first_name: String,
  pub class_name: String,
  /// Formatted session date, e.g. "01.03".
  pub date:       String,
  /// Formatted session start time, e.g. "18:30".
  pub time:       String,
  /// Free-text addendum; required for `Reschedule` and `Custom`.
  pub note:       Option<String>,
}

impl StaffMessage {
  /// Render the message body sent over the staff member's chat channel.
  pub fn render(&self) -> String {
    let StaffMessage { first_name, class_name, date, time, note, .. } = self;
    match self.kind {
      StaffMessageKind::Cancel => format!(
        "Hello, {first_name}!\nThe \"{class_name}\" class on {date} at {time} \
         has been CANCELLED.\nOur apologies!"
      ),
      StaffMessageKind::Reschedule => {
        let detail = note.as_deref().unwrap_or("please check with the front desk");
        format!(
          "Hello, {first_name}!\nPlease note: the \"{class_name}\" class on \
           {date} has been RESCHEDULED.\nNew time: {detail}.\nPlease confirm \
           you received this."
        )
      }
      StaffMessageKind::Remind => format!(
        "Hello, {first_name}!\nA reminder that you are booked for \
         \"{class_name}\" on {date} at {time}.\nSee you there!"
      ),
      StaffMessageKind::Custom => {
        let detail = note.as_deref().unwrap_or_default();
        format!(
          "Hello, {first_name}!\nRegarding the \"{class_name}\" class:\n{detail}"
        )
      }
    }
  }
}

/// Strip a phone number down to the digits `wa.me` expects.
pub fn phone_digits(phone: &str) -> String {
  phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub mod dispatcher;
pub mod email;
pub mod outlook;
pub mod sms;

pub use dispatcher::{FailureObserver, NotificationDispatcher, TracingFailureObserver};
pub use email::{EmailSender, ResendEmailClient};
pub use outlook::{CalendarProvider, OutlookCalendarClient};
pub use sms::{normalize_e164, SmsSender, TwilioSmsClient};

// =====================================================================================
// NOTIFICATION CELL - EMAIL, SMS & CALENDAR DELIVERY
// =====================================================================================
//
// Outbound provider clients (Resend, Twilio, Microsoft Graph) behind small async
// traits, plus a dispatcher that runs deliveries as detached tasks so a request
// never waits on a provider.
//
// =====================================================================================

pub mod models;
pub mod services;

pub use models::{CalendarEvent, Delivery, EmailMessage, NotificationError, SmsMessage, TokenGrant};
pub use services::{
    CalendarProvider, EmailSender, FailureObserver, NotificationDispatcher,
    OutlookCalendarClient, ResendEmailClient, SmsSender, TracingFailureObserver, TwilioSmsClient,
};

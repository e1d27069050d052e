use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use notification_cell::{
    CalendarEvent, CalendarProvider, EmailMessage, EmailSender, NotificationDispatcher,
    OutlookCalendarClient, ResendEmailClient, SmsMessage, SmsSender, TwilioSmsClient,
};
use security_cell::ValidationService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::SessionUser;

use crate::models::Appointment;

const LONG_DATE_FORMAT: &str = "%A, %B %-d, %Y at %-I:%M %p UTC";
const SHORT_DATE_FORMAT: &str = "%a, %b %-d, %-I:%M %p UTC";

/// Fans a newly created appointment out to calendars, email and SMS without blocking the caller.
pub struct AppointmentNotifier {
    dispatcher: NotificationDispatcher,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    calendar: Arc<dyn CalendarProvider>,
    practice_name: String,
}

impl AppointmentNotifier {
    pub fn new(
        dispatcher: NotificationDispatcher,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        calendar: Arc<dyn CalendarProvider>,
        practice_name: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            email,
            sms,
            calendar,
            practice_name: practice_name.into(),
        }
    }

    /// Production wiring: Resend, Twilio and Outlook clients built from `config`.
    pub fn from_config(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self::new(
            NotificationDispatcher::default(),
            Arc::new(ResendEmailClient::new(config)),
            Arc::new(TwilioSmsClient::new(config)),
            Arc::new(OutlookCalendarClient::new(config, supabase)),
            config.practice_name.clone(),
        )
    }

    /// Schedules every delivery for `appointment`. Handles are returned for tests only.
    pub fn appointment_created(
        &self,
        creator: &SessionUser,
        appointment: &Appointment,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        let event = calendar_event(appointment);

        let mut calendar_owners: Vec<Uuid> = vec![creator.id];
        if let Some(doctor_id) = appointment.assigned_doctor_id {
            if doctor_id != creator.id {
                calendar_owners.push(doctor_id);
            }
        }
        for owner in calendar_owners {
            let calendar = self.calendar.clone();
            let event = event.clone();
            handles.push(self.dispatcher.dispatch("calendar_event", async move {
                calendar.create_event(owner, &event).await
            }));
        }

        if let Some(message) = doctor_email(appointment) {
            let email = self.email.clone();
            handles.push(
                self.dispatcher
                    .dispatch("doctor_email", async move { email.send(&message).await }),
            );
        }

        if let Some(message) = patient_email(appointment, &self.practice_name) {
            let email = self.email.clone();
            handles.push(
                self.dispatcher
                    .dispatch("patient_email", async move { email.send(&message).await }),
            );
        }

        if let Some(message) = patient_sms(appointment, &self.practice_name) {
            let sms = self.sms.clone();
            handles.push(
                self.dispatcher
                    .dispatch("patient_sms", async move { sms.send(&message).await }),
            );
        }

        handles
    }
}

// ==============================================================================
// MESSAGE TEMPLATES
// ==============================================================================

fn long_date(date: DateTime<Utc>) -> String {
    date.format(LONG_DATE_FORMAT).to_string()
}

fn short_date(date: DateTime<Utc>) -> String {
    date.format(SHORT_DATE_FORMAT).to_string()
}

pub fn calendar_event(appointment: &Appointment) -> CalendarEvent {
    let mut lines = Vec::new();
    if let Some(notes) = appointment.internal_notes.as_deref().filter(|n| !n.is_empty()) {
        lines.push(notes.to_string());
    }
    if !appointment.added_by.is_empty() {
        lines.push(format!("Added by: {}", appointment.added_by));
    }
    if let Some(link) = appointment.one_drive_link.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("OneDrive: {}", link));
    }

    CalendarEvent {
        subject: format!("{} – {}", appointment.patient_name, appointment.exam_type),
        start: appointment.appointment_date,
        end: appointment.end_time(),
        body: (!lines.is_empty()).then(|| lines.join("\n")),
    }
}

/// Sent only when the assigned doctor's email is known.
pub fn doctor_email(appointment: &Appointment) -> Option<EmailMessage> {
    let doctor = appointment.assigned_doctor.as_ref()?;
    let to = doctor.email.clone().filter(|e| !e.is_empty())?;
    let esc = ValidationService::escape_html;
    let when = long_date(appointment.appointment_date);

    let mut html = format!(
        "<p>A new appointment has been assigned to you.</p>\
         <p><strong>Patient:</strong> {}<br/>\
         <strong>Exam:</strong> {}<br/>\
         <strong>When:</strong> {} ({} minutes)<br/>\
         <strong>Added by:</strong> {}</p>",
        esc(&appointment.patient_name),
        esc(&appointment.exam_type),
        esc(&when),
        appointment.duration_minutes,
        esc(&appointment.added_by),
    );
    if let Some(notes) = appointment.internal_notes.as_deref() {
        html.push_str(&format!("<p><strong>Notes:</strong> {}</p>", esc(notes)));
    }
    if let Some(link) = appointment.one_drive_link.as_deref() {
        let link = esc(link);
        html.push_str(&format!("<p><a href=\"{}\">{}</a></p>", link, link));
    }

    Some(EmailMessage {
        to: vec![to],
        subject: format!(
            "New appointment: {} – {} ({})",
            appointment.patient_name,
            appointment.exam_type,
            short_date(appointment.appointment_date)
        ),
        html,
    })
}

pub fn patient_email(appointment: &Appointment, practice_name: &str) -> Option<EmailMessage> {
    let to = appointment.patient_email.clone().filter(|e| !e.is_empty())?;
    let esc = ValidationService::escape_html;
    let when = long_date(appointment.appointment_date);

    let html = format!(
        "<p>Hello {},</p>\
         <p>Your appointment at {} is confirmed.</p>\
         <p><strong>Exam:</strong> {}<br/>\
         <strong>When:</strong> {}<br/>\
         <strong>Duration:</strong> {} minutes</p>\
         <p>If you have questions or need to reschedule, reply to this email or call us.</p>",
        esc(&appointment.patient_name),
        esc(practice_name),
        esc(&appointment.exam_type),
        esc(&when),
        appointment.duration_minutes,
    );

    Some(EmailMessage {
        to: vec![to],
        subject: format!(
            "Appointment confirmed: {} – {}",
            appointment.exam_type,
            short_date(appointment.appointment_date)
        ),
        html,
    })
}

pub fn patient_sms(appointment: &Appointment, practice_name: &str) -> Option<SmsMessage> {
    let to = appointment.patient_phone.clone().filter(|p| !p.is_empty())?;

    Some(SmsMessage {
        to,
        body: format!(
            "Your appointment at {} is confirmed: {} – {}. Reply with questions or call us.",
            practice_name,
            short_date(appointment.appointment_date),
            appointment.exam_type
        ),
    })
}

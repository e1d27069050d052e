use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mockall::mock;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::AppointmentNotifier;
use notification_cell::{
    CalendarEvent, CalendarProvider, Delivery, EmailMessage, EmailSender, FailureObserver,
    NotificationDispatcher, NotificationError, SmsMessage, SmsSender,
};
use shared_models::user::DoctorSummary;
use shared_utils::test_utils::TestUser;

mock! {
    pub Email {}

    #[async_trait]
    impl EmailSender for Email {
        async fn send(&self, message: &EmailMessage) -> Result<Delivery, NotificationError>;
    }
}

mock! {
    pub Sms {}

    #[async_trait]
    impl SmsSender for Sms {
        async fn send(&self, message: &SmsMessage) -> Result<Delivery, NotificationError>;
    }
}

mock! {
    pub Calendar {}

    #[async_trait]
    impl CalendarProvider for Calendar {
        async fn create_event(
            &self,
            user_id: Uuid,
            event: &CalendarEvent,
        ) -> Result<Delivery, NotificationError>;
    }
}

#[derive(Default)]
struct RecordingObserver {
    failures: Mutex<Vec<String>>,
}

impl FailureObserver for RecordingObserver {
    fn on_failure(&self, task: &str, _error: &NotificationError) {
        self.failures.lock().unwrap().push(task.to_string());
    }
}

fn appointment(doctor: Option<DoctorSummary>) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_name: "Jane Patient".to_string(),
        added_by: "Front Desk".to_string(),
        patient_phone: Some("555-123-4567".to_string()),
        patient_email: Some("jane@example.com".to_string()),
        appointment_date: Utc::now() + Duration::days(2),
        duration_minutes: 30,
        exam_type: "Eye exam".to_string(),
        status: AppointmentStatus::Scheduled,
        one_drive_link: None,
        internal_notes: Some("Bring glasses".to_string()),
        assigned_doctor_id: doctor.as_ref().map(|d| d.id),
        assigned_doctor: doctor,
        created_at: None,
        updated_at: None,
    }
}

async fn join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn every_channel_is_notified_for_an_assigned_appointment() {
    let creator = TestUser::reception("desk@example.com");
    let doctor = DoctorSummary {
        id: Uuid::new_v4(),
        name: Some("Dr. Who".to_string()),
        email: Some("who@example.com".to_string()),
    };
    let doctor_id = doctor.id;
    let creator_id = creator.id;

    let mut email = MockEmail::new();
    email
        .expect_send()
        .withf(|m| m.to == vec!["who@example.com".to_string()])
        .times(1)
        .returning(|_| Ok(Delivery::Sent));
    email
        .expect_send()
        .withf(|m| m.to == vec!["jane@example.com".to_string()])
        .times(1)
        .returning(|_| Ok(Delivery::Sent));

    let mut sms = MockSms::new();
    sms.expect_send()
        .withf(|m| m.to == "555-123-4567" && m.body.contains("Test Practice"))
        .times(1)
        .returning(|_| Ok(Delivery::Sent));

    let mut calendar = MockCalendar::new();
    calendar
        .expect_create_event()
        .withf(move |user_id, event| {
            (*user_id == creator_id || *user_id == doctor_id)
                && event.subject == "Jane Patient – Eye exam"
        })
        .times(2)
        .returning(|_, _| Ok(Delivery::Sent));

    let notifier = AppointmentNotifier::new(
        NotificationDispatcher::default(),
        Arc::new(email),
        Arc::new(sms),
        Arc::new(calendar),
        "Test Practice",
    );

    let handles = notifier.appointment_created(&creator.to_session_user(), &appointment(Some(doctor)));
    assert_eq!(handles.len(), 5);
    join_all(handles).await;
}

#[tokio::test]
async fn unassigned_appointments_skip_the_doctor() {
    let creator = TestUser::reception("desk@example.com");
    let creator_id = creator.id;

    let mut email = MockEmail::new();
    email
        .expect_send()
        .withf(|m| m.to == vec!["jane@example.com".to_string()])
        .times(1)
        .returning(|_| Ok(Delivery::Sent));

    let mut sms = MockSms::new();
    sms.expect_send().times(1).returning(|_| Ok(Delivery::NotConfigured));

    let mut calendar = MockCalendar::new();
    calendar
        .expect_create_event()
        .withf(move |user_id, _| *user_id == creator_id)
        .times(1)
        .returning(|_, _| Ok(Delivery::NotConnected));

    let notifier = AppointmentNotifier::new(
        NotificationDispatcher::default(),
        Arc::new(email),
        Arc::new(sms),
        Arc::new(calendar),
        "Test Practice",
    );

    join_all(notifier.appointment_created(&creator.to_session_user(), &appointment(None))).await;
}

#[tokio::test]
async fn one_failed_delivery_does_not_stop_the_others() {
    let creator = TestUser::reception("desk@example.com");
    let observer = Arc::new(RecordingObserver::default());

    let mut email = MockEmail::new();
    email.expect_send().times(1).returning(|_| {
        Err(NotificationError::Provider {
            status: 500,
            message: "down".to_string(),
        })
    });

    let mut sms = MockSms::new();
    sms.expect_send().times(1).returning(|_| Ok(Delivery::Sent));

    let mut calendar = MockCalendar::new();
    calendar
        .expect_create_event()
        .times(1)
        .returning(|_, _| Ok(Delivery::Sent));

    let notifier = AppointmentNotifier::new(
        NotificationDispatcher::new(observer.clone()),
        Arc::new(email),
        Arc::new(sms),
        Arc::new(calendar),
        "Test Practice",
    );

    join_all(notifier.appointment_created(&creator.to_session_user(), &appointment(None))).await;

    assert_eq!(*observer.failures.lock().unwrap(), vec!["patient_email".to_string()]);
}

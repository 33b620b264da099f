pub mod capability;
pub mod dispatcher;
pub mod services;
pub mod task;

pub use capability::ProcessTasksCapability;
pub use dispatcher::{DispatchError, DispatchReport, TaskDispatcher, TaskOutcome};
pub use services::{
    CalendarEvent, CalendarService, GoogleCalendar, HttpMailer, Mailer, OutgoingEmail, Quote,
    QuoteSource, ServiceError, YahooQuotes,
};
pub use task::TodoTask;

pub mod config;
pub mod error;
pub mod mailer;
pub mod templates;
pub mod transport;

pub use config::Config;
pub use error::Error;
pub use mailer::{DEFAULT_LOCALE, Mailer, MailerBuilder, SendOptions};
pub use templates::{EmailIndex, LayoutIndex, LocaleTemplates, LocalizedEmail, Template};
pub use transport::{MailgunTransport, NoopTransport, OutgoingEmail, Transport};

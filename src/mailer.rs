use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::templates::{self, EmailIndex, LayoutIndex, LocaleTemplates, Template, build_context};
use crate::transport::{MailgunTransport, OutgoingEmail, Transport};

pub const DEFAULT_LOCALE: &str = "en";

/// Called with the email name and the composed message just before dispatch.
pub type BeforeSend = Box<dyn Fn(&str, &OutgoingEmail) + Send + Sync>;

/// Per-call options. `locale` and `layout` steer resolution; `subject`,
/// `text` and `html` act as fallbacks when the locale has no template for
/// that field; everything else passes through to the transport.
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    pub locale: Option<String>,
    pub layout: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Localized email sender. Templates are loaded once when built and the
/// indices stay immutable afterwards, so `send` is safe to call concurrently.
pub struct Mailer {
    emails: EmailIndex,
    layouts: LayoutIndex,
    transport: Arc<dyn Transport>,
    default_locale: String,
    default_layout: Option<String>,
    before_send: Option<BeforeSend>,
}

impl Mailer {
    pub fn builder() -> MailerBuilder {
        MailerBuilder::new()
    }

    /// Render the named email for the given locale and dispatch it.
    pub async fn send(&self, name: &str, data: &Value, opts: SendOptions) -> Result<(), Error> {
        let locales = self
            .emails
            .get(name)
            .ok_or_else(|| Error::EmailNotFound(name.to_string()))?;

        let locale = opts.locale.as_deref().unwrap_or(&self.default_locale);

        let email = locales
            .get(locale)
            .or_else(|| locales.get(self.default_locale.as_str()))
            .ok_or_else(|| Error::LocaleNotFound(name.to_string()))?;

        let subject = render_field(&email.subject, data, name, "subject")?
            .or_else(|| opts.subject.clone())
            .unwrap_or_default();

        let text = render_field(&email.text, data, name, "text")?
            .or_else(|| opts.text.clone())
            .unwrap_or_default();

        let html = match render_field(&email.html, data, name, "html")? {
            Some(body) => match self.resolve_layout(&opts) {
                Some((layout_name, layout)) => {
                    let mut context = build_context(data);
                    context.insert("html", &body);
                    layout
                        .render_context(&context)
                        .map_err(|e| Error::template(layout_name, e))?
                }
                None => body,
            },
            // Passthrough html is never wrapped in a layout.
            None => opts.html.clone().unwrap_or_default(),
        };

        let message = OutgoingEmail {
            from: opts.from,
            to: opts.to,
            subject,
            text,
            html,
            headers: opts.headers,
        };

        if let Some(hook) = &self.before_send {
            hook(name, &message);
        }

        self.transport
            .send(&message)
            .await
            .map_err(Error::Transport)
    }

    /// Locale map for one email name.
    pub fn get_email_by_name(&self, name: &str) -> Option<&LocaleTemplates> {
        self.emails.get(name)
    }

    /// The full loaded index.
    pub fn get_emails(&self) -> &EmailIndex {
        &self.emails
    }

    fn resolve_layout<'a>(&'a self, opts: &'a SendOptions) -> Option<(&'a str, &'a Template)> {
        let requested = opts.layout.as_deref().or(self.default_layout.as_deref())?;

        match self.layouts.get(requested) {
            Some(layout) => Some((requested, layout)),
            None => {
                if opts.layout.is_some() {
                    warn!("layout not found: {}", requested);
                }
                None
            }
        }
    }
}

fn render_field(
    template: &Option<Template>,
    data: &Value,
    name: &str,
    field: &str,
) -> Result<Option<String>, Error> {
    match template {
        Some(template) => template
            .render(data)
            .map(Some)
            .map_err(|e| Error::template(format!("{}/{}", name, field), e)),
        None => Ok(None),
    }
}

pub struct MailerBuilder {
    dir: Option<PathBuf>,
    transport: Option<Arc<dyn Transport>>,
    default_locale: String,
    default_layout: Option<String>,
    before_send: Option<BeforeSend>,
}

impl Default for MailerBuilder {
    fn default() -> Self {
        MailerBuilder {
            dir: None,
            transport: None,
            default_locale: DEFAULT_LOCALE.to_string(),
            default_layout: None,
            before_send: None,
        }
    }
}

impl MailerBuilder {
    pub fn new() -> Self {
        MailerBuilder::default()
    }

    /// Seed a builder from a parsed config file. A `[mailgun]` section
    /// selects the Mailgun transport.
    pub fn from_config(config: &Config) -> Self {
        let mut builder = MailerBuilder::new().default_locale(&config.templates.default_locale);

        if let Some(dir) = &config.templates.dir {
            builder = builder.dir(dir);
        }

        if let Some(layout) = &config.templates.default_layout {
            builder = builder.default_layout(layout);
        }

        if let Some(mailgun) = &config.mailgun {
            builder = builder.transport(MailgunTransport::new(&mailgun.key, &mailgun.domain));
        }

        builder
    }

    /// Template root to scan. Without it the mailer builds with an empty
    /// index.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Layout applied when a call does not name one.
    pub fn default_layout(mut self, layout: impl Into<String>) -> Self {
        self.default_layout = Some(layout.into());
        self
    }

    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &OutgoingEmail) + Send + Sync + 'static,
    {
        self.before_send = Some(Box::new(hook));
        self
    }

    /// Scan the template directory and assemble the mailer.
    pub async fn build(self) -> Result<Mailer, Error> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Config("no emailer given".to_string()))?;

        let (emails, layouts) = match &self.dir {
            Some(dir) => templates::load_directory(dir).await?,
            None => (EmailIndex::new(), LayoutIndex::new()),
        };

        Ok(Mailer {
            emails,
            layouts,
            transport,
            default_locale: self.default_locale,
            default_layout: self.default_layout,
            before_send: self.before_send,
        })
    }
}

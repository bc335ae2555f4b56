use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use anyhow::Result;

use crate::transport::{OutgoingEmail, Transport};

#[derive(Deserialize, Debug)]
pub struct MailgunResponse {
    pub id: Option<String>,
    pub message: Option<String>,
}

/// Sends through the Mailgun messages API.
#[derive(Debug, Clone)]
pub struct MailgunTransport {
    key: String,
    domain: String,
    client: Client,
}

impl MailgunTransport {
    pub fn new(key: &str, domain: &str) -> Self {
        Self {
            key: key.to_string(),
            domain: domain.to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("https://api.mailgun.net/v3/{}/messages", self.domain)
    }

    /// Flatten a message into Mailgun form fields. Recognized X-Mailgun
    /// headers become `o:` options, everything else is forwarded as a custom
    /// `h:` header. `X-Mailgun-Variables` is not forwarded.
    fn form_params(email: &OutgoingEmail) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(from) = &email.from {
            params.push(("from".to_string(), from.clone()));
        }
        if let Some(to) = &email.to {
            params.push(("to".to_string(), to.clone()));
        }

        params.push(("subject".to_string(), email.subject.clone()));
        params.push(("text".to_string(), email.text.clone()));
        params.push(("html".to_string(), email.html.clone()));

        for (key, value) in &email.headers {
            let field = match key.as_str() {
                "X-Mailgun-Tag" => "o:tag",
                "X-Mailgun-Campaign-Id" => "o:campaign",
                "X-Mailgun-Dkim" => "o:dkim",
                "X-Mailgun-Deliver-By" => "o:deliverytime",
                "X-Mailgun-Drop-Message" => "o:tracking",
                "X-Mailgun-Track" => "o:tracking",
                "X-Mailgun-Track-Clicks" => "o:tracking-clicks",
                "X-Mailgun-Track-Opens" => "o:tracking-opens",
                "X-Mailgun-Variables" => continue,
                other => {
                    params.push((format!("h:{}", other), value.clone()));
                    continue;
                }
            };
            params.push((field.to_string(), value.clone()));
        }

        params
    }
}

#[async_trait]
impl Transport for MailgunTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .basic_auth("api", Some(&self.key))
            .form(&Self::form_params(email))
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            if let Ok(body) = response.json::<MailgunResponse>().await {
                tracing::debug!("Mailgun accepted message: {:?}", body);
            }
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow::anyhow!("mailgun returned {}: {}", status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_with_header(key: &str, value: &str) -> OutgoingEmail {
        let mut email = OutgoingEmail {
            from: Some("a@example.com".to_string()),
            to: Some("b@example.com".to_string()),
            subject: "hi".to_string(),
            ..Default::default()
        };
        email.headers.insert(key.to_string(), value.to_string());
        email
    }

    fn field<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn maps_recognized_headers_to_options() {
        let cases = [
            ("X-Mailgun-Tag", "o:tag"),
            ("X-Mailgun-Campaign-Id", "o:campaign"),
            ("X-Mailgun-Dkim", "o:dkim"),
            ("X-Mailgun-Deliver-By", "o:deliverytime"),
            ("X-Mailgun-Drop-Message", "o:tracking"),
            ("X-Mailgun-Track", "o:tracking"),
            ("X-Mailgun-Track-Clicks", "o:tracking-clicks"),
            ("X-Mailgun-Track-Opens", "o:tracking-opens"),
        ];

        for (header, expected) in cases {
            let params = MailgunTransport::form_params(&email_with_header(header, "yes"));
            assert_eq!(field(&params, expected), Some("yes"), "{}", header);
            assert!(field(&params, &format!("h:{}", header)).is_none());
        }
    }

    #[test]
    fn forwards_unknown_headers_as_custom() {
        let params = MailgunTransport::form_params(&email_with_header("Reply-To", "c@example.com"));
        assert_eq!(field(&params, "h:Reply-To"), Some("c@example.com"));
    }

    #[test]
    fn drops_variables_header() {
        let params = MailgunTransport::form_params(&email_with_header("X-Mailgun-Variables", "{}"));
        assert!(field(&params, "h:X-Mailgun-Variables").is_none());
        assert!(!params.iter().any(|(_, v)| v == "{}"));
    }

    #[test]
    fn includes_rendered_fields() {
        let email = OutgoingEmail {
            from: Some("a@example.com".to_string()),
            to: Some("b@example.com".to_string()),
            subject: "Welcome".to_string(),
            text: "hello".to_string(),
            html: "<p>hello</p>".to_string(),
            ..Default::default()
        };

        let params = MailgunTransport::form_params(&email);

        assert_eq!(field(&params, "from"), Some("a@example.com"));
        assert_eq!(field(&params, "to"), Some("b@example.com"));
        assert_eq!(field(&params, "subject"), Some("Welcome"));
        assert_eq!(field(&params, "text"), Some("hello"));
        assert_eq!(field(&params, "html"), Some("<p>hello</p>"));
    }

    #[test]
    fn endpoint_targets_configured_domain() {
        let transport = MailgunTransport::new("key-123", "mg.example.com");
        assert_eq!(
            transport.endpoint(),
            "https://api.mailgun.net/v3/mg.example.com/messages"
        );
    }
}

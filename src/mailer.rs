use anyhow::{Context, Result};
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::fs;
use tracing::info;

use crate::config::SmtpConfig;
use crate::invoice_gen::{GeneratedInvoice, InvoiceRecord};

/// Sends generated invoices over SMTP.
pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build the invoice email with the generated file attached.
    ///
    /// A `.pdf` that is really the Markdown fallback goes out as `text/plain`.
    pub fn build_message(
        &self,
        record: &InvoiceRecord,
        generated: &GeneratedInvoice,
        recipient: &str,
    ) -> Result<Message> {
        let content = fs::read(&generated.pdf_path)
            .with_context(|| format!("reading {}", generated.pdf_path.display()))?;

        let mime_type = if content.starts_with(b"%PDF") {
            mime::APPLICATION_PDF
        } else {
            mime::TEXT_PLAIN_UTF_8
        };
        let content_type = ContentType::parse(mime_type.as_ref())?;

        let greeting = record
            .client
            .as_ref()
            .map(|c| format!("Hello {},", c.name))
            .unwrap_or_else(|| "Hello,".to_string());
        let body = format!(
            "{greeting}\n\nPlease find attached invoice {} for \"{}\".\n\nPayment terms: Due upon receipt\n",
            record.number, record.title
        );

        let email = Message::builder()
            .from(self.config.from.parse()?)
            .to(recipient.parse()?)
            .subject(format!("Invoice {} - {}", record.number, record.title))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(
                        Attachment::new(format!("{}.pdf", record.file_stem()))
                            .body(content, content_type),
                    ),
            )?;

        Ok(email)
    }

    pub fn send(
        &self,
        record: &InvoiceRecord,
        generated: &GeneratedInvoice,
        recipient: &str,
    ) -> Result<()> {
        let email = self.build_message(record, generated, recipient)?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let transport = SmtpTransport::relay(&self.config.host)?
            .credentials(creds)
            .build();

        transport
            .send(&email)
            .with_context(|| format!("sending invoice {} to {}", record.number, recipient))?;

        info!(invoice = %record.number, %recipient, "invoice email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice_gen::ClientSnapshot;
    use chrono::NaiveDate;

    fn mailer() -> Mailer {
        Mailer::new(SmtpConfig {
            host: "smtp.example.com".into(),
            username: "user".into(),
            password: "secret".into(),
            from: "billing@example.com".into(),
        })
    }

    fn record() -> InvoiceRecord {
        InvoiceRecord {
            number: "INV-ABC".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            project_id: "abc".into(),
            title: "Audit".into(),
            description: None,
            budget: 100.0,
            completed_on: None,
            client: Some(ClientSnapshot {
                name: "Acme".into(),
                email: Some("ap@acme.test".into()),
                company: None,
            }),
        }
    }

    #[test]
    fn fallback_attachment_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("invoice-audit-INV-ABC.pdf");
        fs::write(&pdf_path, "# INVOICE\n").unwrap();
        let generated = GeneratedInvoice {
            markdown_path: dir.path().join("invoice-audit-INV-ABC.md"),
            pdf_path,
            converted: false,
        };

        let message = mailer()
            .build_message(&record(), &generated, "ap@acme.test")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Invoice INV-ABC - Audit"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("invoice-audit-INV-ABC.pdf"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("x.pdf");
        fs::write(&pdf_path, "%PDF-1.7").unwrap();
        let generated = GeneratedInvoice {
            markdown_path: dir.path().join("x.md"),
            pdf_path,
            converted: true,
        };

        assert!(mailer().build_message(&record(), &generated, "not an address").is_err());
    }
}

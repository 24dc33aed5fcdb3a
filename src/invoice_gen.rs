use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::aggregate::format_currency;
use crate::error::{StoreError, StoreResult};
use crate::models::{Client, Project};

const INVOICE_DATE_FORMAT: &str = "%b %d, %Y";

/// `INV-` followed by the first eight characters of the project id, uppercased.
pub fn invoice_number(project_id: &str) -> String {
    let prefix: String = project_id.chars().take(8).collect();
    if prefix.is_empty() {
        "INV-00000000".to_string()
    } else {
        format!("INV-{}", prefix.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSnapshot {
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
}

impl From<&Client> for ClientSnapshot {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            email: Some(client.email.clone()).filter(|e| !e.is_empty()),
            company: client.company.clone().filter(|c| !c.is_empty()),
        }
    }
}

/// Everything printed on an invoice for one completed project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub number: String,
    pub date: NaiveDate,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub budget: f64,
    pub completed_on: Option<NaiveDate>,
    pub client: Option<ClientSnapshot>,
}

impl InvoiceRecord {
    pub fn for_project(
        project: &Project,
        client: Option<&Client>,
        today: NaiveDate,
    ) -> StoreResult<Self> {
        if !project.is_completed() {
            return Err(StoreError::validation(format!(
                "only completed projects can be invoiced, \"{}\" is {}",
                project.title,
                project.status.label()
            )));
        }

        Ok(Self {
            number: invoice_number(&project.id),
            date: today,
            project_id: project.id.clone(),
            title: project.title.clone(),
            description: project.description.clone().filter(|d| !d.trim().is_empty()),
            budget: project.budget,
            completed_on: project.actual_end_date.or(project.deadline),
            client: client.map(ClientSnapshot::from),
        })
    }

    /// `invoice-<title slug>-<number>`, without extension.
    pub fn file_stem(&self) -> String {
        let slug = self
            .title
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        format!("invoice-{}-{}", slug, self.number)
    }

    pub fn client_email(&self) -> Option<&str> {
        self.client.as_ref().and_then(|c| c.email.as_deref())
    }

    pub fn to_markdown(&self) -> String {
        let mut content = String::new();

        content.push_str("# INVOICE\n\n");
        content.push_str(&format!("**Invoice #:** {}  \n", self.number));
        content.push_str(&format!(
            "**Date:** {}\n\n",
            self.date.format(INVOICE_DATE_FORMAT)
        ));

        content.push_str("## Project Details\n\n");
        content.push_str(&format!("- **Project Name:** {}\n", self.title));
        if let Some(description) = &self.description {
            content.push_str(&format!("- **Description:** {}\n", description));
        }
        content.push_str("- **Status:** Completed\n");
        if let Some(completed_on) = self.completed_on {
            content.push_str(&format!(
                "- **Completion Date:** {}\n",
                completed_on.format(INVOICE_DATE_FORMAT)
            ));
        }
        content.push('\n');

        content.push_str("## Client Information\n\n");
        match &self.client {
            Some(client) => {
                content.push_str(&format!("- **Client Name:** {}\n", client.name));
                if let Some(email) = &client.email {
                    content.push_str(&format!("- **Email:** {}\n", email));
                }
                if let Some(company) = &client.company {
                    content.push_str(&format!("- **Company:** {}\n", company));
                }
            }
            None => content.push_str("- **Client Name:** N/A\n"),
        }
        content.push('\n');

        let amount = format_currency(self.budget);
        content.push_str("## Financial Details\n\n");
        content.push_str("| | |\n|---|---:|\n");
        content.push_str(&format!("| Project Budget | {} |\n", amount));
        content.push_str("| Tax Rate | 0% |\n");
        content.push_str(&format!("| **Total Amount Due** | **{}** |\n\n", amount));

        content.push_str("---\n\n");
        content.push_str("Thank you for your business! This invoice was generated automatically.  \n");
        content.push_str("Payment terms: Due upon receipt\n");

        content
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedInvoice {
    pub markdown_path: PathBuf,
    pub pdf_path: PathBuf,
    /// False when the `.pdf` file is a copy of the Markdown.
    pub converted: bool,
}

/// Service for generating invoice files in Markdown and PDF format
pub struct InvoiceGenerator {
    output_dir: PathBuf,
    converter: String,
}

impl InvoiceGenerator {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;

        Ok(Self {
            output_dir,
            converter: "pandoc".to_string(),
        })
    }

    /// Use another Markdown-to-PDF program with pandoc's `<in> -o <out>` arguments.
    pub fn with_converter(mut self, program: impl Into<String>) -> Self {
        self.converter = program.into();
        self
    }

    /// Write the Markdown invoice and convert it to PDF if the converter runs.
    pub fn generate(&self, record: &InvoiceRecord) -> Result<GeneratedInvoice> {
        let stem = record.file_stem();
        let markdown_path = self.output_dir.join(format!("{stem}.md"));
        let pdf_path = self.output_dir.join(format!("{stem}.pdf"));

        fs::write(&markdown_path, record.to_markdown())
            .with_context(|| format!("writing {}", markdown_path.display()))?;

        let converted = match Command::new(&self.converter)
            .arg(&markdown_path)
            .arg("-o")
            .arg(&pdf_path)
            .output()
        {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                let error = String::from_utf8_lossy(&output.stderr);
                warn!(converter = %self.converter, %error, "failed to generate PDF");
                false
            }
            Err(e) => {
                warn!(converter = %self.converter, error = %e, "could not run PDF converter");
                false
            }
        };

        if !converted {
            // Keep a file at the .pdf path so it can still be attached.
            fs::copy(&markdown_path, &pdf_path)
                .with_context(|| format!("writing {}", pdf_path.display()))?;
        }

        info!(
            invoice = %record.number,
            path = %pdf_path.display(),
            converted,
            "invoice generated"
        );

        Ok(GeneratedInvoice {
            markdown_path,
            pdf_path,
            converted,
        })
    }
}

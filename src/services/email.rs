use crate::config::email::{dashboard_url, EmailConfig};
use crate::models::ReportModel;
use crate::utils::{data_uri, format::file_stem};
use anyhow::Result;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Outcome of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// SMTP is not configured; nothing left the process.
    Skipped,
}

#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: Option<String>,
    dashboard_url: String,
}

impl EmailService {
    /// Build from environment variables. Without SMTP settings every send
    /// reports [`Delivery::Skipped`].
    pub fn from_env() -> Self {
        let Some(cfg) = EmailConfig::from_env() else {
            return Self::disabled();
        };

        let creds = Credentials::new(cfg.smtp_username.clone(), cfg.smtp_password.clone());
        match AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .map(|builder| builder.port(cfg.smtp_port).credentials(creds).build())
        {
            Ok(transport) => Self {
                transport: Some(transport),
                from_address: Some(cfg.from_address),
                dashboard_url: cfg.dashboard_url,
            },
            Err(e) => {
                tracing::warn!("Failed to build SMTP transport: {e}");
                Self {
                    dashboard_url: cfg.dashboard_url,
                    ..Self::disabled()
                }
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from_address: None,
            dashboard_url: dashboard_url(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Mail a finished report with its file attached.
    pub async fn send_report_email(&self, to: &str, report: &ReportModel) -> Result<Delivery> {
        let subject = format!(
            "{} - {}",
            report.title,
            report
                .generated_at
                .unwrap_or(report.created_at)
                .format("%d/%m/%Y")
        );
        let body = self.report_body(report);
        let attachment = report
            .file_url
            .as_deref()
            .and_then(data_uri::decode)
            .map(|file| {
                let name = format!(
                    "{}.{}",
                    file_stem(&report.title),
                    report.file_format.extension()
                );
                (name, file)
            });

        let Some((transport, from)) = self.transport.as_ref().zip(self.from_address.as_deref())
        else {
            tracing::debug!(report_id = %report.id, "SMTP not configured, skipping email to {to}");
            return Ok(Delivery::Skipped);
        };

        let from: Mailbox = from
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid from address '{from}': {e}"))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid to address '{to}': {e}"))?;

        let text = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body);
        let builder = Message::builder().from(from).to(to_mailbox).subject(subject);
        let email = match attachment {
            Some((name, file)) => {
                let content_type = ContentType::parse(&file.mime)
                    .unwrap_or(ContentType::TEXT_PLAIN);
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(text)
                        .singlepart(Attachment::new(name).body(file.bytes, content_type)),
                )?
            }
            None => builder.singlepart(text)?,
        };

        transport.send(email).await?;
        tracing::info!(report_id = %report.id, "Report email sent to {to}");
        Ok(Delivery::Sent)
    }

    fn report_body(&self, report: &ReportModel) -> String {
        let summary = report
            .summary_data
            .as_ref()
            .and_then(|s| s.get("executiveSummary"))
            .and_then(|s| s.as_str())
            .unwrap_or_default();
        format!(
            "Halo,\n\nLaporan \"{}\" untuk periode {} s/d {} telah selesai dibuat.\n\n{}\n\nLihat laporan lengkap di: {}/reports/{}\n",
            report.title,
            report.period_start.format("%d/%m/%Y"),
            report.period_end.format("%d/%m/%Y"),
            summary,
            self.dashboard_url.trim_end_matches('/'),
            report.id,
        )
    }
}

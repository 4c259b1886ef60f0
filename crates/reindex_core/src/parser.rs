//! Structured parsing of raw message bytes.

use crate::error::{ReindexError, Result};
use crate::types::{Address, ParsedMessage, RawMessage};
use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeader, MailHeaderMap, ParsedMail};

/// Turns opaque raw bytes into a structured message.
pub trait MessageParser {
    /// Parses one message.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the bytes aren't a parsable message.
    fn parse(&self, raw: &RawMessage) -> Result<ParsedMessage>;
}

/// RFC 5322 / MIME parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeParser;

impl MessageParser for MimeParser {
    fn parse(&self, raw: &RawMessage) -> Result<ParsedMessage> {
        let mail = mailparse::parse_mail(raw.as_bytes())
            .map_err(|e| ReindexError::MalformedMessage(e.to_string()))?;
        if mail.headers.is_empty() {
            return Err(ReindexError::MalformedMessage(
                "message has no headers".to_string(),
            ));
        }

        let from = mail
            .headers
            .get_first_header("From")
            .and_then(|h| parse_addresses(h).into_iter().next());

        let mut recipients = Vec::new();
        for name in ["To", "Cc", "Bcc"] {
            for header in mail.headers.get_all_headers(name) {
                recipients.extend(parse_addresses(header));
            }
        }

        let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
        let date = mail
            .headers
            .get_first_value("Date")
            .and_then(|value| parse_date(&value));

        let body = extract_body(&mail)?;

        Ok(ParsedMessage {
            from,
            recipients,
            subject: subject.trim().to_string(),
            date,
            body,
        })
    }
}

/// Strict RFC 2822 first, then the lenient parser for sloppy headers.
///
/// `dateparse` reports input with no recognisable date as 0, so that value is
/// treated as absent.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    match mailparse::dateparse(value) {
        Ok(secs) if secs != 0 => DateTime::<Utc>::from_timestamp(secs, 0),
        _ => None,
    }
}

/// Unparsable address headers contribute no addresses.
fn parse_addresses(header: &MailHeader) -> Vec<Address> {
    let Ok(list) = mailparse::addrparse_header(header) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for addr in list.iter() {
        match addr {
            MailAddr::Single(info) => out.push(Address {
                name: info.display_name.clone(),
                email: info.addr.clone(),
            }),
            MailAddr::Group(group) => {
                out.extend(group.addrs.iter().map(|info| Address {
                    name: info.display_name.clone(),
                    email: info.addr.clone(),
                }));
            }
        }
    }
    out
}

/// Collects `text/plain` parts; a single non-multipart text body is used as is.
fn extract_body(mail: &ParsedMail) -> Result<String> {
    let mut parts = Vec::new();
    collect_plain_text(mail, &mut parts)?;

    if parts.is_empty() && mail.subparts.is_empty() && mail.ctype.mimetype.starts_with("text/") {
        parts.push(decoded_body(mail)?);
    }

    Ok(parts.join("\n"))
}

fn collect_plain_text(part: &ParsedMail, out: &mut Vec<String>) -> Result<()> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            out.push(decoded_body(part)?);
        }
        return Ok(());
    }
    for sub in &part.subparts {
        collect_plain_text(sub, out)?;
    }
    Ok(())
}

fn decoded_body(part: &ParsedMail) -> Result<String> {
    part.get_body()
        .map(|body| body.trim().to_string())
        .map_err(|e| ReindexError::MalformedMessage(format!("undecodable body: {}", e)))
}

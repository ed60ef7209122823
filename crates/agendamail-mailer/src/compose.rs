//! Digest composition.
//!
//! Turns a batch of normalized events into a subject line, an HTML body and a
//! plain-text fallback. The footer timestamp comes from the reference instant
//! of the batch, never from the clock.

use agendamail_core::format::{clock_12h, html_escape, long_date};
use agendamail_core::NormalizedEvent;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Attendees listed per event before the rest are summarized.
const MAX_LISTED_ATTENDEES: usize = 3;

const RULE_WIDTH: usize = 50;

const SIGNATURE: &str = "Sent by agendamail";

/// Everything the composer needs for one digest.
#[derive(Debug, Clone)]
pub struct DigestRequest<'a> {
    /// Events in display order.
    pub events: &'a [NormalizedEvent],
    /// Name used in the greeting.
    pub recipient_name: &'a str,
    /// The instant the batch was pinned to.
    pub reference: DateTime<Utc>,
    /// Zone the footer timestamp is rendered in.
    pub timezone: Tz,
    /// Length of the look-ahead window.
    pub window_hours: u32,
}

/// A rendered digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Renders the digest for `request`.
pub fn compose_digest(request: &DigestRequest<'_>) -> ComposedMessage {
    ComposedMessage {
        subject: subject_line(request.events.len(), request.window_hours),
        html_body: html_body(request),
        text_body: text_body(request),
    }
}

/// Subject line for a digest of `count` events.
pub fn subject_line(count: usize, window_hours: u32) -> String {
    match count {
        0 => format!("Your Schedule - All Clear for the Next {window_hours} Hours!"),
        1 => format!("Your Schedule - 1 Appointment in the Next {window_hours} Hours"),
        n => format!("Your Schedule - {n} Appointments in the Next {window_hours} Hours"),
    }
}

fn generated_line(request: &DigestRequest<'_>) -> String {
    let local = request.reference.with_timezone(&request.timezone);
    format!(
        "Generated at {} on {}",
        clock_12h(&local),
        long_date(local.date_naive())
    )
}

fn all_clear(window_hours: u32) -> String {
    format!("You're all clear for the next {window_hours} hours!")
}

fn text_body(request: &DigestRequest<'_>) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut lines = vec![
        format!("Your Schedule - Next {} Hours", request.window_hours),
        heavy.clone(),
        String::new(),
        format!("Hi {},", request.recipient_name),
        String::new(),
        format!(
            "Here's your upcoming schedule for the next {} hours:",
            request.window_hours
        ),
    ];

    if request.events.is_empty() {
        lines.push(String::new());
        lines.push(all_clear(request.window_hours));
    }

    for event in request.events {
        lines.push(String::new());
        lines.push(event.date_label.clone());
        lines.push(format!("[{}] {}", event.time_label, event.title));
        if let Some(location) = &event.location {
            lines.push(format!("Location: {location}"));
        }
        if let Some(url) = event.meeting_url() {
            lines.push(format!("Join: {url}"));
        }
        if !event.attendees.is_empty() {
            let listed: Vec<&str> = event
                .attendees
                .iter()
                .take(MAX_LISTED_ATTENDEES)
                .map(String::as_str)
                .collect();
            lines.push(format!("With: {}", listed.join(", ")));
        }
        lines.push(light.clone());
    }

    lines.push(String::new());
    lines.push(heavy);
    lines.push(generated_line(request));
    lines.push(SIGNATURE.to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn html_body(request: &DigestRequest<'_>) -> String {
    let events_html = if request.events.is_empty() {
        format!(
            r#"<div style="background-color: #F3F4F6; padding: 30px; border-radius: 8px; text-align: center; margin: 20px 0;">
<p style="font-size: 18px; color: #6B7280; margin: 0;">{}</p>
</div>"#,
            html_escape(&all_clear(request.window_hours))
        )
    } else {
        request
            .events
            .iter()
            .map(event_card)
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;">
<div style="max-width: 600px; margin: 0 auto; background-color: #FFFFFF;">
<div style="background-color: #4F46E5; padding: 30px 20px; text-align: center;">
<h1 style="color: #FFFFFF; margin: 0; font-size: 24px; font-weight: 600;">Your Schedule - Next {hours} Hours</h1>
</div>
<div style="padding: 30px 20px;">
<p style="font-size: 16px; color: #374151; margin-bottom: 20px;">Hi {name},</p>
<p style="font-size: 16px; color: #374151; margin-bottom: 30px;">Here's your upcoming schedule for the next {hours} hours:</p>
{events}
</div>
<div style="background-color: #F9FAFB; padding: 20px; text-align: center; border-top: 1px solid #E5E7EB;">
<p style="color: #9CA3AF; font-size: 14px; margin: 0;">{generated}</p>
<p style="color: #9CA3AF; font-size: 14px; margin: 10px 0 0 0;">{signature}</p>
</div>
</div>
</body>
</html>
"#,
        hours = request.window_hours,
        name = html_escape(request.recipient_name),
        events = events_html,
        generated = html_escape(&generated_line(request)),
        signature = SIGNATURE,
    )
}

fn detail_row(label: &str, value_html: &str) -> String {
    format!(
        r#"<p style="margin: 8px 0; color: #374151; font-size: 14px;"><strong style="color: #6B7280;">{label}:</strong> {value_html}</p>"#
    )
}

fn event_card(event: &NormalizedEvent) -> String {
    let mut rows = vec![
        detail_row("Date", &html_escape(&event.date_label)),
        detail_row("Time", &html_escape(&event.time_label)),
    ];

    match (&event.meeting_link, &event.location) {
        (Some(link), location) => {
            let label = location
                .as_deref()
                .unwrap_or_else(|| link.kind.display_name());
            rows.push(detail_row(
                "Join",
                &format!(
                    r#"<a href="{}" style="color: #4F46E5; text-decoration: none;">{}</a>"#,
                    html_escape(&link.url),
                    html_escape(label)
                ),
            ));
        }
        (None, Some(location)) => rows.push(detail_row("Location", &html_escape(location))),
        (None, None) => {}
    }

    if !event.attendees.is_empty() {
        let mut listed = event
            .attendees
            .iter()
            .take(MAX_LISTED_ATTENDEES)
            .map(|a| html_escape(a))
            .collect::<Vec<_>>()
            .join(", ");
        let hidden = event.attendees.len().saturating_sub(MAX_LISTED_ATTENDEES);
        if hidden > 0 {
            listed.push_str(&format!(" +{hidden} more"));
        }
        rows.push(detail_row("With", &listed));
    }

    format!(
        r#"<div style="background-color: #FFFFFF; padding: 20px; border-radius: 8px; margin: 15px 0; border-left: 4px solid #4F46E5;">
<h3 style="margin: 0 0 12px 0; color: #111827; font-size: 18px; font-weight: 600;">{}</h3>
{}
</div>"#,
        html_escape(&event.title),
        rows.join("\n")
    )
}

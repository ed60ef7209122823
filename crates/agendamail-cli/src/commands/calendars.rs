//! Calendar listing.

use std::fmt::Write as _;

use agendamail_providers::google::{CalendarListEntry, GoogleProvider};

use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::run::block_on;

/// Prints the calendars the stored token can read.
pub fn list(config: &ClientConfig) -> AppResult<()> {
    let provider = GoogleProvider::new(config.google_config()?);
    let calendars = block_on(provider.list_calendars())??;
    print!("{}", render(&calendars));
    Ok(())
}

/// Formats calendars one block each, primary calendar flagged.
pub fn render(calendars: &[CalendarListEntry]) -> String {
    let mut out = String::new();

    if calendars.is_empty() {
        out.push_str("No calendars are visible to this account.\n");
        return out;
    }

    for calendar in calendars {
        let name = if calendar.summary.is_empty() {
            "(No name)"
        } else {
            calendar.summary.as_str()
        };
        let primary = if calendar.primary { " [PRIMARY]" } else { "" };
        let _ = writeln!(out, "Calendar: {}{}", name, primary);
        let _ = writeln!(out, "  ID: {}", calendar.id);
        let _ = writeln!(
            out,
            "  Access: {}",
            calendar.access_role.as_deref().unwrap_or("unknown")
        );
        out.push('\n');
    }

    out.push_str("Set calendar.id in config.toml, or CALENDAR_ID in .env, to one of the IDs above.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, summary: &str, primary: bool, role: Option<&str>) -> CalendarListEntry {
        CalendarListEntry {
            id: id.to_string(),
            summary: summary.to_string(),
            description: None,
            primary,
            access_role: role.map(String::from),
            time_zone: None,
        }
    }

    #[test]
    fn renders_each_calendar() {
        let out = render(&[
            entry("alice@example.com", "Alice", true, Some("owner")),
            entry("team@group.calendar.google.com", "Team", false, Some("reader")),
        ]);
        assert_eq!(
            out,
            "Calendar: Alice [PRIMARY]\n  ID: alice@example.com\n  Access: owner\n\n\
             Calendar: Team\n  ID: team@group.calendar.google.com\n  Access: reader\n\n\
             Set calendar.id in config.toml, or CALENDAR_ID in .env, to one of the IDs above.\n"
        );
    }

    #[test]
    fn unnamed_calendar_and_unknown_role() {
        let out = render(&[entry("x@example.com", "", false, None)]);
        assert!(out.starts_with("Calendar: (No name)\n"));
        assert!(out.contains("  Access: unknown\n"));
    }

    #[test]
    fn empty_list() {
        assert_eq!(render(&[]), "No calendars are visible to this account.\n");
    }

    #[test]
    fn missing_token_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.google.token_path = Some(dir.path().join("token.json"));

        let err = list(&config).unwrap_err();
        assert_eq!(err.exit_status(), crate::error::ExitStatus::MissingPrerequisite);
    }
}

//! Date helper functions

use anyhow::{anyhow, Result};
use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Formats publication timestamps for display in a fixed locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
    /// Pattern already translated to chrono's strftime syntax
    pattern: String,
}

impl DateFormatter {
    /// Create a formatter from a BCP 47 language tag (`pt-BR`), an IANA
    /// timezone name and a date-fns style pattern (`dd MMM yyyy`)
    pub fn new(language: &str, timezone: &str, format: &str) -> Result<Self> {
        let locale = parse_locale(language)?;
        let timezone = if timezone.is_empty() {
            Tz::UTC
        } else {
            timezone
                .parse::<Tz>()
                .map_err(|e| anyhow!("invalid timezone {:?}: {}", timezone, e))?
        };

        Ok(Self {
            locale,
            timezone,
            pattern: date_fns_to_chrono_format(format),
        })
    }

    /// Create a formatter from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(&config.language, &config.timezone, &config.date_format)
    }

    /// Format a timestamp for display
    pub fn format(&self, date: &DateTime<Utc>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.pattern, self.locale)
            .to_string()
    }

    /// Parse and format an ISO timestamp, `None` when it cannot be parsed
    pub fn format_iso(&self, iso: &str) -> Option<String> {
        parse_timestamp(iso).map(|date| self.format(&date))
    }
}

/// Format a date in ISO 8601 / XML format, used for `<time datetime>`
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Parse a CMS timestamp
///
/// Accepts RFC 3339 as well as the colon-less offset form the CMS emits
/// (`2021-03-25T19:25:28+0000`).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|date| date.with_timezone(&Utc))
        .ok()
}

fn parse_locale(language: &str) -> Result<Locale> {
    let name = language.replace('-', "_");
    Locale::try_from(name.as_str()).map_err(|_| anyhow!("unknown locale: {}", language))
}

/// Convert a date-fns format string to chrono format
///
/// Letters are grouped into runs (`dd`, `MMM`, `yyyy`) and mapped as a
/// whole; text in single quotes is copied literally.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is an escaped quote
            if chars.get(i + 1) == Some(&'\'') {
                result.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut result, c);
            i += 1;
            continue;
        }

        let mut len = 1;
        while i + len < chars.len() && chars[i + len] == c {
            len += 1;
        }

        let token = match (c, len) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', 4) => "%A",
            ('E', _) => "%a",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('a', _) => "%p",
            _ => "",
        };

        if token.is_empty() {
            for _ in 0..len {
                push_literal(&mut result, c);
            }
        } else {
            result.push_str(token);
        }
        i += len;
    }

    result
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

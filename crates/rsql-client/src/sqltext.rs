//! SQL text templating with named placeholders.
//!
//! [`SqlPart`] holds a template with placeholders of the form `{{name}}`;
//! the bind methods replace every occurrence of a placeholder by a safely
//! rendered literal. [`SqlText`] concatenates parts into the final batch
//! string.
//!
//! ```rust
//! use rsql_client::SqlPart;
//!
//! let text = SqlPart::new("INSERT INTO mydb..parents (fname, lname) VALUES ({{fname}}, {{lname}});")
//!     .bind_str("fname", "John")
//!     .bind_str("lname", "O'Hara")
//!     .text()
//!     .unwrap();
//! assert_eq!(text, "INSERT INTO mydb..parents (fname, lname) VALUES ('John', 'O''Hara');");
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Errors raised while binding placeholder values or assembling the final
/// text.
///
/// The first error is latched on the part and surfaces from
/// [`SqlPart::text`]; the bind methods keep chaining past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The bound name does not appear in the template.
    #[error("param \"{0}\": not known")]
    UnknownPlaceholder(String),

    /// A placeholder was never bound before assembly.
    #[error("placeholder \"{0}\" has not been filled by a bind method")]
    UnfilledPlaceholder(String),

    /// A numeric string contains characters outside a number literal.
    #[error("param \"{param}\": number {value} is invalid")]
    InvalidNumber {
        /// The placeholder being bound.
        param: String,
        /// The rejected value.
        value: String,
    },

    /// A float bind received NaN or an infinity, which the server cannot
    /// store.
    #[error("param \"{param}\": invalid float, is {kind}")]
    NonFiniteFloat {
        /// The placeholder being bound.
        param: String,
        /// `"NaN"` or `"infinite"`.
        kind: &'static str,
    },
}

/// Aggregator concatenating [`SqlPart`]s into one batch string.
#[derive(Debug, Default)]
pub struct SqlText {
    parts: Vec<SqlPart>,
    linefeed: Vec<bool>,
}

impl SqlText {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part followed by a newline.
    pub fn addln(&mut self, part: SqlPart) {
        self.parts.push(part);
        self.linefeed.push(true);
    }

    /// Append a part with no trailing newline.
    pub fn add(&mut self, part: SqlPart) {
        self.parts.push(part);
        self.linefeed.push(false);
    }

    /// Number of parts added so far.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Assemble the full batch string.
    ///
    /// Fails if any part latched a bind error or still carries an unfilled
    /// placeholder.
    pub fn text(&self) -> Result<String, TemplateError> {
        let mut out = String::new();
        for (part, &linefeed) in self.parts.iter().zip(&self.linefeed) {
            out.push_str(&part.text()?);
            if linefeed {
                out.push('\n');
            }
        }
        Ok(out)
    }
}

/// A SQL text fragment with named placeholders.
///
/// Placeholder names are case-insensitive; several placeholders may share a
/// name, in which case one bind replaces all of them. Delimiters default to
/// `{{` and `}}` (see [`SqlPart::with_delimiters`]).
#[derive(Debug, Clone)]
pub struct SqlPart {
    text: String,
    /// SQL fragments in order; `None` marks a placeholder slot that a bind
    /// method fills.
    fragments: Vec<Option<String>>,
    /// Placeholder name to the fragment slots it occupies.
    placeholders: HashMap<String, Vec<usize>>,
    err: Option<TemplateError>,
}

impl SqlPart {
    /// Parse a template using the default `{{`/`}}` delimiters.
    ///
    /// # Panics
    ///
    /// Panics on malformed templates: nested or unterminated delimiters,
    /// an empty placeholder name, or a newline inside a placeholder. These
    /// are programming errors in the template itself.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_delimiters(text, "{{", "}}")
    }

    /// Parse a template using custom placeholder delimiters.
    ///
    /// # Panics
    ///
    /// Panics if a delimiter is empty or both are equal, and on malformed
    /// templates as described for [`SqlPart::new`].
    #[must_use]
    pub fn with_delimiters(text: &str, left: &str, right: &str) -> Self {
        assert!(!left.is_empty(), "opening placeholder delimiter cannot be empty");
        assert!(!right.is_empty(), "closing placeholder delimiter cannot be empty");
        assert!(left != right, "placeholder delimiters must differ");

        let bytes = text.as_bytes();
        let left = left.as_bytes();
        let right = right.as_bytes();

        let mut fragments: Vec<Option<String>> = Vec::new();
        let mut placeholders: HashMap<String, Vec<usize>> = HashMap::new();

        let mut in_placeholder = false;
        let mut fragment_start = 0usize;
        let mut placeholder_start = 0usize;
        let mut line_no = 1usize;

        let mut i = 0usize;
        while i < bytes.len() {
            if bytes[i..].starts_with(left) {
                assert!(
                    !in_placeholder,
                    "invalid opening delimiter for placeholder (line {line_no})"
                );
                in_placeholder = true;

                if fragment_start != i {
                    fragments.push(Some(
                        String::from_utf8_lossy(&bytes[fragment_start..i]).into_owned(),
                    ));
                }

                i += left.len();
                placeholder_start = i;
                continue;
            }

            if bytes[i..].starts_with(right) {
                assert!(
                    in_placeholder,
                    "invalid closing delimiter for placeholder (line {line_no})"
                );

                let name = String::from_utf8_lossy(&bytes[placeholder_start..i])
                    .trim()
                    .to_lowercase();
                assert!(!name.is_empty(), "placeholder name cannot be empty (line {line_no})");

                fragments.push(None);
                placeholders.entry(name).or_default().push(fragments.len() - 1);

                i += right.len();
                fragment_start = i;
                in_placeholder = false;
                continue;
            }

            if bytes[i] == b'\n' {
                assert!(
                    !in_placeholder,
                    "placeholder closing delimiter not found (line {line_no})"
                );
                line_no += 1;
            }

            i += 1;
        }

        assert!(
            !in_placeholder,
            "closing delimiter expected for placeholder (line {line_no})"
        );

        if fragment_start != i {
            fragments.push(Some(
                String::from_utf8_lossy(&bytes[fragment_start..i]).into_owned(),
            ));
        }

        SqlPart {
            text: text.to_string(),
            fragments,
            placeholders,
            err: None,
        }
    }

    /// The original template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.text
    }

    /// The first bind error latched on this part, if any.
    ///
    /// Checking once after a chain of binds is easier than checking every
    /// bind individually.
    #[must_use]
    pub fn err(&self) -> Option<&TemplateError> {
        self.err.as_ref()
    }

    /// Replace the placeholder by the literal `NULL`.
    #[must_use]
    pub fn bind_null(self, param: &str) -> Self {
        self.set_param(param, "NULL".to_string())
    }

    /// Replace the placeholder by a binary literal such as `0x1234`.
    ///
    /// An empty slice renders as `0x`; use [`SqlPart::bind_null`] for NULL.
    #[must_use]
    pub fn bind_bytes(self, param: &str, value: &[u8]) -> Self {
        let mut literal = String::with_capacity(2 + 2 * value.len());
        literal.push_str("0x");
        for b in value {
            let _ = write!(literal, "{b:02x}");
        }
        self.set_param(param, literal)
    }

    /// Replace the placeholder by a single-quoted string literal, doubling
    /// embedded single quotes.
    #[must_use]
    pub fn bind_str(self, param: &str, value: &str) -> Self {
        let literal = format!("'{}'", value.replace('\'', "''"));
        self.set_param(param, literal)
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_int64(self, param: &str, value: i64) -> Self {
        self.set_param(param, value.to_string())
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_int32(self, param: &str, value: i32) -> Self {
        self.bind_int64(param, i64::from(value))
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_int16(self, param: &str, value: i16) -> Self {
        self.bind_int64(param, i64::from(value))
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_int8(self, param: &str, value: i8) -> Self {
        self.bind_int64(param, i64::from(value))
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_uint64(self, param: &str, value: u64) -> Self {
        self.set_param(param, value.to_string())
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_uint32(self, param: &str, value: u32) -> Self {
        self.bind_uint64(param, u64::from(value))
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_uint16(self, param: &str, value: u16) -> Self {
        self.bind_uint64(param, u64::from(value))
    }

    /// Replace the placeholder by an integer literal.
    #[must_use]
    pub fn bind_uint8(self, param: &str, value: u8) -> Self {
        self.bind_uint64(param, u64::from(value))
    }

    /// Replace the placeholder by a validated numeric string such as
    /// `-1.234e-3`.
    ///
    /// Use this for numbers outside the primitive types, e.g. decimals kept
    /// as text. The value may contain digits, one decimal dot, one exponent
    /// symbol and signs in their legal positions; anything else latches an
    /// error.
    #[must_use]
    pub fn bind_numstr(mut self, param: &str, value: &str) -> Self {
        if self.err.is_some() {
            return self;
        }

        let trimmed = value.trim();
        if !is_valid_number(trimmed) {
            self.err = Some(TemplateError::InvalidNumber {
                param: param.to_string(),
                value: trimmed.to_string(),
            });
            return self;
        }

        self.set_param(param, trimmed.to_string())
    }

    /// Replace the placeholder by a float literal.
    ///
    /// NaN and infinities cannot be stored by the server and latch an
    /// error.
    #[must_use]
    pub fn bind_float64(mut self, param: &str, value: f64) -> Self {
        if self.err.is_some() {
            return self;
        }

        if value.is_infinite() {
            self.err = Some(TemplateError::NonFiniteFloat {
                param: param.to_string(),
                kind: "infinite",
            });
            return self;
        }
        if value.is_nan() {
            self.err = Some(TemplateError::NonFiniteFloat {
                param: param.to_string(),
                kind: "NaN",
            });
            return self;
        }

        self.set_param(param, format!("{value:E}"))
    }

    /// Replace the placeholder by a quoted date literal such as
    /// `'20161204'`.
    #[must_use]
    pub fn bind_date(self, param: &str, value: NaiveDate) -> Self {
        self.set_param(param, format!("'{}'", value.format("%Y%m%d")))
    }

    /// Replace the placeholder by a quoted time literal such as
    /// `'15:04:05'`, with nanoseconds appended when nonzero.
    #[must_use]
    pub fn bind_time(self, param: &str, value: NaiveTime) -> Self {
        let mut literal = format!("'{}", value.format("%H:%M:%S"));
        push_fraction(&mut literal, value.nanosecond());
        literal.push('\'');
        self.set_param(param, literal)
    }

    /// Replace the placeholder by a quoted datetime literal, using the
    /// shortest form that preserves the value: `'20060102'` for midnight,
    /// `'2006-01-02T15:04:05'` with a time part, and a fractional suffix
    /// when nanoseconds are nonzero.
    #[must_use]
    pub fn bind_datetime(self, param: &str, value: NaiveDateTime) -> Self {
        let time = value.time();
        let literal = if time.nanosecond() != 0 {
            let mut s = format!("'{}", value.format("%Y-%m-%dT%H:%M:%S"));
            push_fraction(&mut s, time.nanosecond());
            s.push('\'');
            s
        } else if time != NaiveTime::MIN {
            format!("'{}'", value.format("%Y-%m-%dT%H:%M:%S"))
        } else {
            format!("'{}'", value.format("%Y%m%d"))
        };
        self.set_param(param, literal)
    }

    /// Assemble this part's text with all placeholders replaced.
    pub fn text(&self) -> Result<String, TemplateError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let mut out = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            match fragment {
                Some(s) => out.push_str(s),
                None => {
                    // An unfilled slot: find the name that owns it.
                    let name = self
                        .placeholders
                        .iter()
                        .find(|(_, slots)| slots.contains(&i))
                        .map(|(name, _)| name.clone())
                        .unwrap_or_default();
                    return Err(TemplateError::UnfilledPlaceholder(name));
                }
            }
        }
        Ok(out)
    }

    /// Replace all occurrences of `param` by the rendered literal.
    fn set_param(mut self, param: &str, literal: String) -> Self {
        if self.err.is_some() {
            return self;
        }

        let key = param.to_lowercase();
        match self.placeholders.get(&key) {
            Some(slots) => {
                for &slot in slots {
                    self.fragments[slot] = Some(literal.clone());
                }
            }
            None => {
                self.err = Some(TemplateError::UnknownPlaceholder(key));
            }
        }
        self
    }
}

/// Append `.fffffffff` with trailing zeros stripped, when nonzero.
fn push_fraction(out: &mut String, nanos: u32) {
    if nanos != 0 {
        let digits = format!("{nanos:09}");
        let _ = write!(out, ".{}", digits.trim_end_matches('0'));
    }
}

fn is_valid_number(s: &str) -> bool {
    let mut dot_seen = false;
    let mut exponent_at: Option<usize> = None;

    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => {}
            'e' | 'E' => {
                if exponent_at.is_some() {
                    return false;
                }
                exponent_at = Some(i);
            }
            '+' | '-' => {
                // A sign is legal only first or right after the exponent.
                let after_exponent = exponent_at.map(|e| e + 1) == Some(i);
                if i != 0 && !after_exponent {
                    return false;
                }
            }
            '.' => {
                if dot_seen {
                    return false;
                }
                dot_seen = true;
            }
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_str_escapes_quotes() {
        let text = SqlPart::new("VALUES ({{name}})")
            .bind_str("name", "O'Hara")
            .text()
            .unwrap();
        assert_eq!(text, "VALUES ('O''Hara')");
    }

    #[test]
    fn test_same_placeholder_replaced_everywhere() {
        let text = SqlPart::new("{{a}} + {{a}} = {{b}}")
            .bind_int64("a", 2)
            .bind_int64("b", 4)
            .text()
            .unwrap();
        assert_eq!(text, "2 + 2 = 4");
    }

    #[test]
    fn test_placeholder_names_are_case_insensitive() {
        let text = SqlPart::new("SELECT {{Name}}")
            .bind_str("NAME", "x")
            .text()
            .unwrap();
        assert_eq!(text, "SELECT 'x'");
    }

    #[test]
    fn test_unknown_placeholder_latches_error() {
        let part = SqlPart::new("SELECT {{a}}").bind_int64("missing", 1);
        assert!(matches!(
            part.err(),
            Some(TemplateError::UnknownPlaceholder(name)) if name == "missing"
        ));
        assert!(part.text().is_err());
    }

    #[test]
    fn test_unfilled_placeholder_fails_assembly() {
        let err = SqlPart::new("SELECT {{a}}, {{b}}")
            .bind_int64("a", 1)
            .text()
            .unwrap_err();
        assert_eq!(err, TemplateError::UnfilledPlaceholder("b".into()));
    }

    #[test]
    fn test_bind_bytes() {
        let text = SqlPart::new("({{v}}, {{empty}})")
            .bind_bytes("v", &[0x12, 0x34])
            .bind_bytes("empty", &[])
            .text()
            .unwrap();
        assert_eq!(text, "(0x1234, 0x)");
    }

    #[test]
    fn test_bind_numstr_validation() {
        assert!(SqlPart::new("{{n}}").bind_numstr("n", "-1.234e-3").err().is_none());
        assert!(SqlPart::new("{{n}}").bind_numstr("n", " 42 ").err().is_none());
        assert!(SqlPart::new("{{n}}").bind_numstr("n", "1.2.3").err().is_some());
        assert!(SqlPart::new("{{n}}").bind_numstr("n", "1e2e3").err().is_some());
        assert!(SqlPart::new("{{n}}").bind_numstr("n", "12a").err().is_some());
        assert!(SqlPart::new("{{n}}").bind_numstr("n", "1-2").err().is_some());
    }

    #[test]
    fn test_bind_float_rejects_non_finite() {
        assert!(SqlPart::new("{{f}}").bind_float64("f", f64::NAN).err().is_some());
        assert!(SqlPart::new("{{f}}").bind_float64("f", f64::INFINITY).err().is_some());
        assert!(SqlPart::new("{{f}}").bind_float64("f", 1.5).err().is_none());
    }

    #[test]
    fn test_bind_temporal_literals() {
        let date = NaiveDate::from_ymd_opt(2016, 12, 4).unwrap();
        let text = SqlPart::new("{{d}}").bind_date("d", date).text().unwrap();
        assert_eq!(text, "'20161204'");

        let time = NaiveTime::from_hms_nano_opt(15, 4, 5, 500_000_000).unwrap();
        let text = SqlPart::new("{{t}}").bind_time("t", time).text().unwrap();
        assert_eq!(text, "'15:04:05.5'");

        let midnight = date.and_time(NaiveTime::MIN);
        let text = SqlPart::new("{{dt}}").bind_datetime("dt", midnight).text().unwrap();
        assert_eq!(text, "'20161204'");

        let with_time = date.and_hms_opt(15, 4, 5).unwrap();
        let text = SqlPart::new("{{dt}}").bind_datetime("dt", with_time).text().unwrap();
        assert_eq!(text, "'2016-12-04T15:04:05'");
    }

    #[test]
    fn test_first_error_wins() {
        let part = SqlPart::new("{{a}} {{b}}")
            .bind_numstr("a", "not a number")
            .bind_int64("b", 1);
        assert!(matches!(part.err(), Some(TemplateError::InvalidNumber { .. })));
    }

    #[test]
    fn test_custom_delimiters() {
        let text = SqlPart::with_delimiters("SELECT <<a>>", "<<", ">>")
            .bind_int64("a", 9)
            .text()
            .unwrap();
        assert_eq!(text, "SELECT 9");
    }

    #[test]
    #[should_panic(expected = "closing delimiter")]
    fn test_unterminated_placeholder_panics() {
        let _ = SqlPart::new("SELECT {{a");
    }

    #[test]
    fn test_sqltext_concatenation() {
        let mut sqltext = SqlText::new();
        sqltext.addln(SqlPart::new("SET NOCOUNT ON"));
        sqltext.add(SqlPart::new("SELECT {{id}}").bind_int64("id", 7));
        assert_eq!(sqltext.part_count(), 2);
        assert_eq!(sqltext.text().unwrap(), "SET NOCOUNT ON\nSELECT 7");
    }

    #[test]
    fn test_sqltext_propagates_part_errors() {
        let mut sqltext = SqlText::new();
        sqltext.addln(SqlPart::new("SELECT {{a}}"));
        assert!(sqltext.text().is_err());
    }
}

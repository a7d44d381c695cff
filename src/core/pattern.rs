//! Letter based date patterns such as `MM/dd/yy` or `yyyy-MM-dd'T'HH:mm:ss.SSSXXX`.
//!
//! A pattern is compiled once into a chrono format description and reused for
//! every record. Runs of ASCII letters are fields, text between single quotes is
//! literal (`''` is a quote), and any other character is copied as is.

use crate::utils::error::{Result, TransformError};
use chrono::format::{self, Fixed, Item, Parsed, StrftimeItems};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fmt::Write;

/// Every letter the pattern language reserves.
const PATTERN_LETTERS: &str = "GyYMLwWdDFEuaHkKhmsSzZX";

/// Two digit years land in the window starting this many years before today.
const TWO_DIGIT_YEAR_LOOKBACK: i32 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    pattern: String,
    parse_items: Vec<Item<'static>>,
    format_items: Vec<Item<'static>>,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let (parse_items, format_items) = translate(pattern)?;
        tracing::debug!("Compiled date pattern '{}' into {} items", pattern, format_items.len());
        Ok(Self {
            pattern: pattern.to_string(),
            parse_items,
            format_items,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, instant: &DateTime<Utc>) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", instant.format_with_items(self.format_items.iter())).map_err(|_| {
            TransformError::DateFormatError {
                pattern: self.pattern.clone(),
                reason: format!("cannot render {}", instant.to_rfc3339()),
            }
        })?;
        Ok(out)
    }

    /// Parses the leading part of `text`; whatever follows a complete match is ignored.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>> {
        let parse_error = |reason: String| TransformError::DateParseError {
            input: text.to_string(),
            pattern: self.pattern.clone(),
            reason,
        };

        let mut parsed = Parsed::new();
        format::parse_and_remainder(&mut parsed, text, self.parse_items.iter())
            .map_err(|e| parse_error(e.to_string()))?;
        widen_two_digit_year(&mut parsed, Utc::now().year())
            .map_err(|e| parse_error(e.to_string()))?;
        fill_epoch_defaults(&mut parsed).map_err(|e| parse_error(e.to_string()))?;

        if parsed.offset().is_some() {
            let with_offset = parsed.to_datetime().map_err(|e| parse_error(e.to_string()))?;
            Ok(with_offset.with_timezone(&Utc))
        } else {
            let naive = parsed
                .to_naive_datetime_with_offset(0)
                .map_err(|e| parse_error(e.to_string()))?;
            Ok(Utc.from_utc_datetime(&naive))
        }
    }
}

/// A bare `yy` year is placed within 80 years before and 20 years after `current_year`.
fn widen_two_digit_year(parsed: &mut Parsed, current_year: i32) -> format::ParseResult<()> {
    if parsed.year().is_some() || parsed.year_div_100().is_some() {
        return Ok(());
    }
    match parsed.year_mod_100() {
        Some(yy) => parsed.set_year(i64::from(two_digit_year(yy, current_year))),
        None => Ok(()),
    }
}

fn two_digit_year(yy: i32, current_year: i32) -> i32 {
    let window_start = current_year - TWO_DIGIT_YEAR_LOOKBACK;
    let year = window_start - window_start.rem_euclid(100) + yy;
    if year < window_start {
        year + 100
    } else {
        year
    }
}

/// Fields the pattern did not mention fall back to 1970-01-01T00:00:00.
fn fill_epoch_defaults(parsed: &mut Parsed) -> format::ParseResult<()> {
    let has_year = parsed.year().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.isoyear_mod_100().is_some();
    if !has_year {
        parsed.set_year(1970)?;
    }
    let week_based = parsed.isoweek().is_some();
    if parsed.month().is_none() && parsed.ordinal().is_none() && !week_based {
        parsed.set_month(1)?;
    }
    if parsed.day().is_none() && parsed.ordinal().is_none() && !week_based {
        parsed.set_day(1)?;
    }
    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        (None, Some(_)) => parsed.set_ampm(false)?,
        (Some(_), None) => parsed.set_hour12(12)?,
        (Some(_), Some(_)) => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    Ok(())
}

fn invalid(pattern: &str, reason: impl Into<String>) -> TransformError {
    TransformError::InvalidDatePattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Items used for parsing and for rendering. They only differ for ISO 8601 zones,
/// where parsing accepts `Z`, `+hh`, `+hhmm` or `+hh:mm`.
#[derive(Default)]
struct Items {
    parse: Vec<Item<'static>>,
    format: Vec<Item<'static>>,
}

impl Items {
    fn push_both(&mut self, item: Item<'static>) {
        self.parse.push(item.clone());
        self.format.push(item);
    }

    fn push_literal(&mut self, c: char) {
        let text = c.to_string().into_boxed_str();
        if c.is_whitespace() {
            self.push_both(Item::OwnedSpace(text));
        } else {
            self.push_both(Item::OwnedLiteral(text));
        }
    }

    fn push_strftime(&mut self, pattern: &str, directive: &'static str) -> Result<()> {
        for item in StrftimeItems::new(directive) {
            if item == Item::Error {
                return Err(invalid(pattern, "pattern has no chrono equivalent"));
            }
            self.push_both(item);
        }
        Ok(())
    }

    fn push_field(&mut self, pattern: &str, letter: char, count: usize) -> Result<()> {
        let padded = |short: &'static str, long: &'static str| if count == 1 { short } else { long };
        let directive = match letter {
            'y' => if count == 2 { "%y" } else { "%Y" },
            'Y' => if count == 2 { "%g" } else { "%G" },
            'M' | 'L' => match count {
                1 => "%-m",
                2 => "%m",
                3 => "%b",
                _ => "%B",
            },
            'd' => padded("%-d", "%d"),
            'D' => padded("%-j", "%j"),
            'w' => padded("%-V", "%V"),
            'E' => if count <= 3 { "%a" } else { "%A" },
            'u' => "%u",
            'a' => "%p",
            'H' => padded("%-H", "%H"),
            'h' => padded("%-I", "%I"),
            'm' => padded("%-M", "%M"),
            's' => padded("%-S", "%S"),
            'S' => "%3f",
            'z' => "%Z",
            'Z' => "%z",
            'X' => {
                let render = match count {
                    1 | 2 => Fixed::TimezoneOffsetZ,
                    3 => Fixed::TimezoneOffsetColonZ,
                    _ => {
                        return Err(invalid(
                            pattern,
                            format!("invalid ISO 8601 format: length={}", count),
                        ))
                    }
                };
                self.parse.extend(StrftimeItems::new("%#z"));
                self.format.push(Item::Fixed(render));
                return Ok(());
            }
            other if PATTERN_LETTERS.contains(other) => {
                return Err(invalid(pattern, format!("pattern letter '{}' is not supported", other)))
            }
            other => return Err(invalid(pattern, format!("illegal pattern character '{}'", other))),
        };
        self.push_strftime(pattern, directive)
    }
}

fn translate(pattern: &str) -> Result<(Vec<Item<'static>>, Vec<Item<'static>>)> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut items = Items::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            if chars.get(i) == Some(&'\'') {
                items.push_literal('\'');
                i += 1;
                continue;
            }
            loop {
                match chars.get(i) {
                    None => return Err(invalid(pattern, "unterminated quote")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        items.push_literal('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(&literal) => {
                        items.push_literal(literal);
                        i += 1;
                    }
                }
            }
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while chars.get(i) == Some(&c) {
                i += 1;
            }
            items.push_field(pattern, c, i - start)?;
        } else {
            items.push_literal(c);
            i += 1;
        }
    }
    Ok((items.parse, items.format))
}

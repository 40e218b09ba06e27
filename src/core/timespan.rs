//! CMITimespan arithmetic used when an attempt's session time is folded into
//! the learner's total time.

use crate::core::validators;

const CENTIS_PER_SECOND: u64 = 100;
const CENTIS_PER_MINUTE: u64 = 60 * CENTIS_PER_SECOND;
const CENTIS_PER_HOUR: u64 = 60 * CENTIS_PER_MINUTE;

/// A parsed `HH:MM:SS[.ss]` duration held in centiseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    centis: u64,
    fractional: bool,
}

impl Timespan {
    pub fn parse(value: &str) -> Option<Timespan> {
        if !validators::validate_time_format(value) {
            return None;
        }
        let (clock, fraction) = match value.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (value, None),
        };
        let mut parts = clock.split(':').map(|p| p.parse::<u64>());
        let hours = parts.next()?.ok()?;
        let minutes = parts.next()?.ok()?;
        let seconds = parts.next()?.ok()?;

        // ".5" is half a second, ".05" five hundredths.
        let centis = match fraction {
            Some(f) if f.len() == 1 => f.parse::<u64>().ok()? * 10,
            Some(f) => f.parse::<u64>().ok()?,
            None => 0,
        };

        Some(Timespan {
            centis: hours * CENTIS_PER_HOUR
                + minutes * CENTIS_PER_MINUTE
                + seconds * CENTIS_PER_SECOND
                + centis,
            fractional: fraction.is_some(),
        })
    }

    /// Sum with carry; the result keeps a fraction if either side had one.
    pub fn add(self, other: Timespan) -> Timespan {
        Timespan {
            centis: self.centis.saturating_add(other.centis),
            fractional: self.fractional || other.fractional,
        }
    }

    pub fn render(&self) -> String {
        let hours = self.centis / CENTIS_PER_HOUR;
        let minutes = (self.centis % CENTIS_PER_HOUR) / CENTIS_PER_MINUTE;
        let seconds = (self.centis % CENTIS_PER_MINUTE) / CENTIS_PER_SECOND;
        let centis = self.centis % CENTIS_PER_SECOND;
        if self.fractional {
            format!("{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
        } else {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
    }
}

/// Adds two timespan strings, or `None` if either fails to parse.
pub fn add_timespans(total: &str, session: &str) -> Option<String> {
    let total = Timespan::parse(total)?;
    let session = Timespan::parse(session)?;
    Some(total.add(session).render())
}

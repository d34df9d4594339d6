use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrimError {
    #[error(
        "Invalid trim range {start}s-{end}s: end must be after start and both within 0-{duration}s"
    )]
    InvalidRange { start: u64, end: u64, duration: u64 },

    #[error("Invalid time '{0}': expected M:SS or whole seconds")]
    InvalidTime(String),
}

/// A minute/second pair as typed by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeInput {
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeInput {
    pub fn new(minutes: u64, seconds: u64) -> Self {
        Self { minutes, seconds }
    }

    /// `None` when the value does not fit in a `u64` count of seconds
    pub fn total_seconds(&self) -> Option<u64> {
        self.minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(self.seconds))
    }
}

impl FromStr for TimeInput {
    type Err = TrimError;

    /// Accepts `M:SS` (seconds below 60) or a bare number of seconds
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TrimError::InvalidTime(s.to_string());
        let trimmed = s.trim();

        match trimmed.split_once(':') {
            Some((min, sec)) => {
                let minutes = min.parse::<u64>().map_err(|_| invalid())?;
                let seconds = sec.parse::<u64>().map_err(|_| invalid())?;
                let input = Self::new(minutes, seconds);
                if seconds >= 60 || input.total_seconds().is_none() {
                    return Err(invalid());
                }
                Ok(input)
            }
            None => {
                let total = trimmed.parse::<u64>().map_err(|_| invalid())?;
                Ok(Self::new(total / 60, total % 60))
            }
        }
    }
}

impl fmt::Display for TimeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

/// Unvalidated start/end pair carried on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimRequest {
    pub start: TimeInput,
    pub end: TimeInput,
}

impl TrimRequest {
    pub fn new(start: TimeInput, end: TimeInput) -> Self {
        Self { start, end }
    }
}

/// Validated interval in whole seconds. Only [`resolve`] constructs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrimRange {
    start: u64,
    end: u64,
}

impl TrimRange {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// Convert raw inputs into a range within `[0, duration]` with `end > start`.
/// Values are never clamped or swapped.
pub fn resolve(start: TimeInput, end: TimeInput, duration: u64) -> Result<TrimRange, TrimError> {
    let start = start
        .total_seconds()
        .ok_or_else(|| TrimError::InvalidTime(start.to_string()))?;
    let end = end
        .total_seconds()
        .ok_or_else(|| TrimError::InvalidTime(end.to_string()))?;

    if start > duration || end > duration || end <= start {
        return Err(TrimError::InvalidRange { start, end, duration });
    }

    Ok(TrimRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_valid_range() {
        let range = resolve(TimeInput::new(0, 30), TimeInput::new(1, 0), 120).unwrap();
        assert_eq!(range.start(), 30);
        assert_eq!(range.end(), 60);
        assert_eq!(range.duration(), 30);
    }

    #[test]
    fn test_resolve_keeps_exact_values_across_grid() {
        let duration = 150;
        for start in 0..duration {
            for end in (start + 1)..=duration {
                let range =
                    resolve(TimeInput::new(0, start), TimeInput::new(0, end), duration).unwrap();
                assert_eq!((range.start(), range.end()), (start, end));
            }
        }
    }

    #[test]
    fn test_resolve_rejects_reversed_and_empty() {
        let err = resolve(TimeInput::new(1, 0), TimeInput::new(0, 30), 120).unwrap_err();
        assert_eq!(err, TrimError::InvalidRange { start: 60, end: 30, duration: 120 });

        assert!(resolve(TimeInput::new(0, 45), TimeInput::new(0, 45), 120).is_err());
    }

    #[test]
    fn test_resolve_rejects_out_of_bounds() {
        assert!(resolve(TimeInput::new(0, 0), TimeInput::new(2, 1), 120).is_err());
        assert!(resolve(TimeInput::new(3, 0), TimeInput::new(4, 0), 120).is_err());
        assert!(resolve(TimeInput::new(0, 0), TimeInput::new(2, 0), 120).is_ok());
    }

    #[test]
    fn test_parse_time_input() {
        assert_eq!("1:30".parse::<TimeInput>().unwrap(), TimeInput::new(1, 30));
        assert_eq!("0:05".parse::<TimeInput>().unwrap(), TimeInput::new(0, 5));
        assert_eq!("95".parse::<TimeInput>().unwrap(), TimeInput::new(1, 35));
        assert!("1:75".parse::<TimeInput>().is_err());
        assert!("a:10".parse::<TimeInput>().is_err());
        assert!("-3".parse::<TimeInput>().is_err());
        assert_eq!(TimeInput::new(2, 5).to_string(), "2:05");
    }

    #[test]
    fn test_huge_minutes_are_rejected_not_wrapped() {
        // 307445734561825861 * 60 wraps around to 44 in u64
        let huge = TimeInput::new(307_445_734_561_825_861, 0);
        assert_eq!(huge.total_seconds(), None);
        assert!(matches!(
            "307445734561825861:00".parse::<TimeInput>(),
            Err(TrimError::InvalidTime(_))
        ));

        let err = resolve(huge, TimeInput::new(1, 0), 120).unwrap_err();
        assert_eq!(err, TrimError::InvalidTime("307445734561825861:00".to_string()));
        assert!(resolve(TimeInput::new(0, 0), TimeInput::new(u64::MAX, 59), 120).is_err());
        assert_eq!(TimeInput::new(u64::MAX / 60, 15).total_seconds(), Some(u64::MAX));
    }
}

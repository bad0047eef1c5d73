use crate::config::CUSTOM_RANGE_DEFAULT_DAYS;
use crate::error::InvalidRangeError;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// The predefined "last N days" choices offered by the time-period selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresetPeriod {
    Days7,
    #[default]
    Days30,
    Days60,
    Days90,
    Days180,
    Year1,
}

impl PresetPeriod {
    pub const ALL: [PresetPeriod; 6] = [
        PresetPeriod::Days7,
        PresetPeriod::Days30,
        PresetPeriod::Days60,
        PresetPeriod::Days90,
        PresetPeriod::Days180,
        PresetPeriod::Year1,
    ];

    pub fn days(self) -> i64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days60 => 60,
            Self::Days90 => 90,
            Self::Days180 => 180,
            Self::Year1 => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Days7 => "7 days",
            Self::Days30 => "30 days",
            Self::Days60 => "60 days",
            Self::Days90 => "90 days",
            Self::Days180 => "180 days",
            Self::Year1 => "1 year",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateRangeSelection {
    Predefined(PresetPeriod),
    Custom { start: NaiveDate, end: NaiveDate },
}

impl Default for DateRangeSelection {
    fn default() -> Self {
        Self::Predefined(PresetPeriod::default())
    }
}

impl DateRangeSelection {
    /// The dates the custom pickers start from: a month back through today.
    pub fn default_custom(today: NaiveDate) -> Self {
        Self::Custom {
            start: today - Duration::days(CUSTOM_RANGE_DEFAULT_DAYS),
            end: today,
        }
    }
}

/// Concrete, user-visible bounds (both inclusive) plus the label shown in chart titles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    query_end: NaiveDate,
}

impl ResolvedRange {
    fn new(start: NaiveDate, end: NaiveDate, label: String) -> Result<Self, InvalidRangeError> {
        let query_end = end
            .succ_opt()
            .ok_or(InvalidRangeError::OutOfBounds { date: end })?;
        Ok(Self { start, end, label, query_end })
    }

    /// Bounds to hand the data source. The source excludes its end bound,
    /// so the end is pushed one day out to keep the last visible day.
    pub fn query_bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.query_end)
    }
}

/// Turns a selection into concrete dates. `now` is passed in, never read here.
pub fn resolve(
    selection: &DateRangeSelection,
    now: DateTime<Utc>,
) -> Result<ResolvedRange, InvalidRangeError> {
    match *selection {
        DateRangeSelection::Predefined(period) => {
            let end = now.date_naive();
            let start = end
                .checked_sub_signed(Duration::days(period.days()))
                .ok_or(InvalidRangeError::OutOfBounds { date: end })?;
            ResolvedRange::new(start, end, format!("Last {}", period.label()))
        }
        DateRangeSelection::Custom { start, end } => {
            if start > end {
                return Err(InvalidRangeError::StartAfterEnd { start, end });
            }
            let label = format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
            ResolvedRange::new(start, end, label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_predefined_seven_days() {
        let range = resolve(&DateRangeSelection::Predefined(PresetPeriod::Days7), noon(2024, 6, 10)).unwrap();
        assert_eq!(range.start, date(2024, 6, 3));
        assert_eq!(range.end, date(2024, 6, 10));
        assert_eq!(range.label, "Last 7 days");
    }

    #[test]
    fn test_predefined_year_uses_human_label() {
        let range = resolve(&DateRangeSelection::Predefined(PresetPeriod::Year1), noon(2024, 6, 10)).unwrap();
        assert_eq!(range.start, date(2023, 6, 11));
        assert_eq!(range.label, "Last 1 year");
    }

    #[test]
    fn test_custom_range_label() {
        let selection = DateRangeSelection::Custom { start: date(2024, 6, 1), end: date(2024, 6, 10) };
        let range = resolve(&selection, noon(2024, 7, 1)).unwrap();
        assert_eq!(range.start, date(2024, 6, 1));
        assert_eq!(range.end, date(2024, 6, 10));
        assert_eq!(range.label, "2024-06-01 to 2024-06-10");
    }

    #[test]
    fn test_custom_single_day_is_valid() {
        let selection = DateRangeSelection::Custom { start: date(2024, 6, 1), end: date(2024, 6, 1) };
        let range = resolve(&selection, noon(2024, 7, 1)).unwrap();
        assert_eq!(range.query_bounds(), (date(2024, 6, 1), date(2024, 6, 2)));
    }

    #[test]
    fn test_custom_reversed_range_rejected() {
        let selection = DateRangeSelection::Custom { start: date(2024, 6, 10), end: date(2024, 6, 1) };
        let err = resolve(&selection, noon(2024, 7, 1)).unwrap_err();
        assert_eq!(
            err,
            InvalidRangeError::StartAfterEnd { start: date(2024, 6, 10), end: date(2024, 6, 1) }
        );
    }

    #[test]
    fn test_custom_range_at_calendar_edge_rejected() {
        let selection = DateRangeSelection::Custom { start: NaiveDate::MAX, end: NaiveDate::MAX };
        let err = resolve(&selection, noon(2024, 7, 1)).unwrap_err();
        assert_eq!(err, InvalidRangeError::OutOfBounds { date: NaiveDate::MAX });

        let last_ok = NaiveDate::MAX.pred_opt().unwrap();
        let range = resolve(&DateRangeSelection::Custom { start: last_ok, end: last_ok }, noon(2024, 7, 1)).unwrap();
        assert_eq!(range.query_bounds(), (last_ok, NaiveDate::MAX));
    }

    #[test]
    fn test_query_bounds_extend_end_by_one_day() {
        let range = resolve(&DateRangeSelection::Predefined(PresetPeriod::Days30), noon(2024, 2, 28)).unwrap();
        let (start, end) = range.query_bounds();
        assert_eq!(start, range.start);
        assert_eq!(end, date(2024, 2, 29));
    }

    #[test]
    fn test_default_custom_selection() {
        let selection = DateRangeSelection::default_custom(date(2024, 6, 30));
        assert_eq!(selection, DateRangeSelection::Custom { start: date(2024, 5, 31), end: date(2024, 6, 30) });
        assert_eq!(DateRangeSelection::default(), DateRangeSelection::Predefined(PresetPeriod::Days30));
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..20_000).prop_map(|offset| date(1990, 1, 1) + Duration::days(offset))
    }

    proptest! {
        #[test]
        fn predefined_spans_exactly_its_days(idx in 0usize..PresetPeriod::ALL.len(), now_date in arb_date()) {
            let period = PresetPeriod::ALL[idx];
            let now = Utc.from_utc_datetime(&now_date.and_hms_opt(8, 30, 0).unwrap());
            let range = resolve(&DateRangeSelection::Predefined(period), now).unwrap();
            prop_assert_eq!(range.end, now_date);
            prop_assert_eq!(range.start, now_date - Duration::days(period.days()));
        }

        #[test]
        fn custom_ranges_validate_order(a in arb_date(), b in arb_date()) {
            let result = resolve(&DateRangeSelection::Custom { start: a, end: b }, noon(2024, 1, 1));
            if a <= b {
                let range = result.unwrap();
                prop_assert_eq!(range.label, format!("{} to {}", a.format("%Y-%m-%d"), b.format("%Y-%m-%d")));
            } else {
                prop_assert!(result.is_err());
            }
        }
    }
}

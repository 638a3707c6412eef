use time::{Date, Duration};

/// Monday on or before `date`.
pub fn floor_to_monday(date: Date) -> Date {
    let back = i64::from(date.weekday().number_days_from_monday());
    date.checked_sub(Duration::days(back)).unwrap_or(Date::MIN)
}

/// Monday of the week `offset_weeks` away from the week containing `today`.
/// `None` when the result falls outside the representable date range.
pub fn week_anchor(today: Date, offset_weeks: i64) -> Option<Date> {
    let days = offset_weeks.checked_mul(7)?;
    floor_to_monday(today).checked_add(Duration::days(days))
}

/// `YYYY-MM-DD` serde format for `time::Date`.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn format(date: &Date) -> String {
        date.format(FORMAT).unwrap_or_default()
    }

    pub fn parse(text: &str) -> Result<Date, time::error::Parse> {
        Date::parse(text, FORMAT)
    }

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        let text = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let text = String::deserialize(d)?;
        parse(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
            let text = Option::<String>::deserialize(d)?;
            text.map(|t| parse(&t).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn floor_to_monday_for_each_weekday() {
        assert_eq!(floor_to_monday(date!(2024 - 01 - 08)), date!(2024 - 01 - 08));
        assert_eq!(floor_to_monday(date!(2024 - 01 - 10)), date!(2024 - 01 - 08));
        assert_eq!(floor_to_monday(date!(2024 - 01 - 14)), date!(2024 - 01 - 08));
    }

    #[test]
    fn floor_crosses_month_and_year_boundaries() {
        assert_eq!(floor_to_monday(date!(2025 - 01 - 01)), date!(2024 - 12 - 30));
    }

    #[test]
    fn week_anchor_applies_signed_offset() {
        let today = date!(2024 - 01 - 10);
        assert_eq!(week_anchor(today, 0), Some(date!(2024 - 01 - 08)));
        assert_eq!(week_anchor(today, 1), Some(date!(2024 - 01 - 15)));
        assert_eq!(week_anchor(today, -2), Some(date!(2023 - 12 - 25)));
    }

    #[test]
    fn week_anchor_out_of_range_is_none() {
        assert_eq!(week_anchor(date!(2024 - 01 - 10), i64::MAX), None);
        assert_eq!(week_anchor(date!(2024 - 01 - 10), 10_000_000), None);
    }

    #[test]
    fn iso_date_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "iso_date")]
            day: Date,
        }
        let json = serde_json::to_string(&Wrapper { day: date!(2024 - 03 - 04) }).unwrap();
        assert_eq!(json, r#"{"day":"2024-03-04"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.day, date!(2024 - 03 - 04));
        assert!(serde_json::from_str::<Wrapper>(r#"{"day":"04/03/2024"}"#).is_err());
    }
}

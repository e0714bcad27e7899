use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::Lesson;

pub const LESSONS_PER_WEEK: u32 = 3;

/// Week sheet names carry the lesson dates: "13- 15 - 17 Gen 2025",
/// "23 Aprile 2025", "04-06-Giugno 2025". Up to three day numbers, an
/// Italian month name (full or abbreviated) and a four-digit year.
pub fn parse_sheet_dates(sheet_name: &str) -> Vec<NaiveDate> {
    static MONTH_YEAR_RE: OnceLock<Regex> = OnceLock::new();
    static DAY_RE: OnceLock<Regex> = OnceLock::new();

    let month_year = MONTH_YEAR_RE
        .get_or_init(|| Regex::new(r"([A-Za-z]+)\s+(\d{4})\s*$").unwrap());
    let day = DAY_RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\b").unwrap());

    let Some(caps) = month_year.captures(sheet_name) else {
        return Vec::new();
    };
    let Some(month) = month_number(&caps[1]) else {
        return Vec::new();
    };
    let Ok(year) = caps[2].parse::<i32>() else {
        return Vec::new();
    };

    let prefix = &sheet_name[..caps.get(0).map(|m| m.start()).unwrap_or(0)];
    let days: Vec<u32> = day
        .captures_iter(prefix)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .take(LESSONS_PER_WEEK as usize)
        .collect();

    let mut dates = Vec::new();
    let mut month = month;
    let mut year = year;
    let mut previous_day: Option<u32> = None;

    for day in days {
        // A smaller day after a bigger one means the week crossed into the
        // next month (and December crosses the year).
        if previous_day.is_some_and(|prev| day < prev) {
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }
        previous_day = Some(day);

        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            dates.push(date);
        }
    }

    dates
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match lower.as_str() {
        "gen" | "gennaio" => 1,
        "feb" | "febb" | "febbraio" => 2,
        "mar" | "marzo" => 3,
        "apr" | "aprile" => 4,
        "mag" | "maggio" => 5,
        "giu" | "giugno" => 6,
        "lug" | "luglio" => 7,
        "ago" | "agosto" => 8,
        "set" | "settembre" => 9,
        "ott" | "ottobre" => 10,
        "nov" | "novembre" => 11,
        "dic" | "dicembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Three lessons per week; dates come from the sheet name where parseable.
pub fn build_lessons(week: u32, sheet_name: &str) -> Vec<Lesson> {
    let dates = parse_sheet_dates(sheet_name);

    (1..=LESSONS_PER_WEEK)
        .map(|day| {
            let lesson_number = (week - 1) * LESSONS_PER_WEEK + day;
            Lesson {
                week,
                lesson_number,
                date: dates.get(day as usize - 1).copied(),
                title: format!("Lezione {lesson_number} - Settimana {week} - Giorno {day}"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn three_day_sheet_names_parse() {
        let dates = parse_sheet_dates("13- 15 - 17 Gen 2025");
        assert_eq!(
            dates,
            vec![date(2025, 1, 13), date(2025, 1, 15), date(2025, 1, 17)]
        );
    }

    #[test]
    fn single_day_sheet_names_parse() {
        assert_eq!(parse_sheet_dates("23 Aprile 2025"), vec![date(2025, 4, 23)]);
    }

    #[test]
    fn compact_two_day_names_parse() {
        assert_eq!(
            parse_sheet_dates("04-06-Giugno 2025"),
            vec![date(2025, 6, 4), date(2025, 6, 6)]
        );
    }

    #[test]
    fn descending_days_roll_into_next_month() {
        assert_eq!(
            parse_sheet_dates("27- 29 - 01 Gen 2025"),
            vec![date(2025, 1, 27), date(2025, 1, 29), date(2025, 2, 1)]
        );
    }

    #[test]
    fn december_rollover_crosses_the_year() {
        assert_eq!(
            parse_sheet_dates("29- 31 - 02 Dic 2025"),
            vec![date(2025, 12, 29), date(2025, 12, 31), date(2026, 1, 2)]
        );
    }

    #[test]
    fn abbreviated_months_are_recognized() {
        assert_eq!(
            parse_sheet_dates("3- 5 - 7 Febb 2025"),
            vec![date(2025, 2, 3), date(2025, 2, 5), date(2025, 2, 7)]
        );
    }

    #[test]
    fn noise_between_days_and_month_is_ignored() {
        let dates = parse_sheet_dates("18- 20 - 22 + OpenD Marzo 2025");
        assert_eq!(
            dates,
            vec![date(2025, 3, 18), date(2025, 3, 20), date(2025, 3, 22)]
        );
    }

    #[test]
    fn unparseable_names_yield_no_dates() {
        assert!(parse_sheet_dates("totale FANTAKombat").is_empty());
        assert!(parse_sheet_dates("settimana di prova").is_empty());
    }

    #[test]
    fn lessons_number_sequentially_across_weeks() {
        let lessons = build_lessons(2, "13- 15 - 17 Gen 2025");
        assert_eq!(lessons.len(), 3);
        assert_eq!(lessons[0].lesson_number, 4);
        assert_eq!(lessons[2].lesson_number, 6);
        assert_eq!(lessons[0].date, Some(date(2025, 1, 13)));
    }

    #[test]
    fn lessons_without_dates_still_exist() {
        let lessons = build_lessons(1, "settimana speciale");
        assert_eq!(lessons.len(), 3);
        assert!(lessons.iter().all(|lesson| lesson.date.is_none()));
    }
}

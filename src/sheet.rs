use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Datelike, Utc};
use indexmap::IndexMap;
use regex::Regex;

use crate::calendar::{self, LESSONS_PER_WEEK};
use crate::models::{Action, CellRow, CourseInfo, Lesson, Snapshot, Student, WeekScore};
use crate::points::Scoreboard;

pub const COURSE_NAME: &str = "FantaKombat Fit&Box";

/// First action column in every week sheet; column 1 holds the student name.
const FIRST_ACTION_COLUMN: usize = 2;

const SKIP_NAMES: [&str; 3] = ["Partecipante", "TOTALE", "Tot"];

#[derive(Debug, Default)]
pub struct CourseSheets {
    pub rows: Vec<CellRow>,
    pub lessons: Vec<Lesson>,
    pub total_weeks: u32,
    pub header_mismatches: Vec<String>,
}

pub fn open_course_workbook(path: &Path) -> anyhow::Result<Sheets<BufReader<File>>> {
    open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))
}

pub fn is_total_sheet(name: &str) -> bool {
    name.to_lowercase().contains("totale")
}

/// Walk every week sheet in workbook order and lift out one raw cell per
/// (student, action) position. Blank cells are kept so that a student who
/// shows up in a week sheet gets a week entry even with no marks.
pub fn read_week_sheets(
    workbook: &mut Sheets<BufReader<File>>,
    actions: &[Action],
) -> anyhow::Result<CourseSheets> {
    let names = workbook.sheet_names().to_vec();
    let mut course = CourseSheets::default();
    let mut week = 0u32;

    for name in names {
        if is_total_sheet(&name) {
            continue;
        }
        week += 1;

        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("failed to read sheet '{name}'"))?;

        course.lessons.extend(calendar::build_lessons(week, &name));

        for (row_index, row) in range.rows().enumerate() {
            if row_index == 0 {
                check_headers(&name, row, actions, &mut course.header_mismatches);
                continue;
            }

            let student = row.get(1).map(cell_to_raw).unwrap_or_default();
            if student.is_empty() || is_skip_name(&student) {
                continue;
            }

            for (action_index, _) in actions.iter().enumerate() {
                let raw = row
                    .get(FIRST_ACTION_COLUMN + action_index)
                    .map(cell_to_raw)
                    .unwrap_or_default();
                course.rows.push(CellRow {
                    student: student.clone(),
                    week,
                    action_index,
                    raw,
                });
            }
        }
    }

    course.total_weeks = week;
    Ok(course)
}

/// The `totale` reference sheet: names in column 0, one column per week.
/// Returns each student's summed reference total.
pub fn read_reference_totals(
    workbook: &mut Sheets<BufReader<File>>,
    total_weeks: u32,
) -> anyhow::Result<Vec<(String, f64)>> {
    let names = workbook.sheet_names().to_vec();
    let total_sheet = names
        .iter()
        .find(|name| is_total_sheet(name))
        .cloned()
        .context("workbook has no 'totale' sheet")?;

    let range = workbook
        .worksheet_range(&total_sheet)
        .with_context(|| format!("failed to read sheet '{total_sheet}'"))?;

    let mut totals = Vec::new();
    for row in range.rows().skip(2) {
        let student = row.get(0).map(cell_to_raw).unwrap_or_default();
        if student.is_empty() || is_skip_name(&student) {
            continue;
        }

        let mut sum = 0.0;
        for week in 1..=total_weeks as usize {
            if let Some(value) = row.get(week).and_then(cell_to_number) {
                sum += value;
            }
        }
        totals.push((student, sum));
    }

    Ok(totals)
}

pub fn build_snapshot(
    source_file: &str,
    actions: &[Action],
    course: &CourseSheets,
    board: &Scoreboard,
) -> Snapshot {
    let students: Vec<Student> = board
        .weekly
        .keys()
        .map(|name| Student {
            name: name.clone(),
            email: student_email(name),
        })
        .collect();

    let weekly_scores: IndexMap<String, IndexMap<String, WeekScore>> = board
        .weekly
        .iter()
        .map(|(student, weeks)| {
            let by_week = weeks
                .iter()
                .map(|(week, score)| (format!("week_{week}"), score.clone()))
                .collect();
            (student.clone(), by_week)
        })
        .collect();

    let year = course
        .lessons
        .iter()
        .find_map(|lesson| lesson.date)
        .map(|date| date.year());

    Snapshot {
        extraction_date: Utc::now(),
        source_file: source_file.to_string(),
        course_info: CourseInfo {
            name: COURSE_NAME.to_string(),
            year,
            lessons_per_week: LESSONS_PER_WEEK,
            total_weeks: course.total_weeks,
        },
        actions: actions.to_vec(),
        students,
        lessons: course.lessons.clone(),
        weekly_scores,
        final_totals: crate::points::rank_totals(board),
    }
}

/// Base points advertised in a column header, e.g. "Presenza (+1pt)" or
/// "Assenza (-0,5pt)". Week sheets occasionally drift from the catalog.
pub fn base_points_in_header(header: &str) -> Option<f64> {
    static POINTS_RE: OnceLock<Regex> = OnceLock::new();
    let re = POINTS_RE
        .get_or_init(|| Regex::new(r"\(([+-]?\d+(?:[.,]\d+)?)\s*pt\)").unwrap());
    re.captures(header)
        .and_then(|caps| caps[1].replace(',', ".").parse::<f64>().ok())
}

pub fn student_email(name: &str) -> String {
    static NON_WORD_RE: OnceLock<Regex> = OnceLock::new();
    static DOTS_RE: OnceLock<Regex> = OnceLock::new();

    let non_word = NON_WORD_RE.get_or_init(|| Regex::new(r"[^\w.]").unwrap());
    let dots = DOTS_RE.get_or_init(|| Regex::new(r"\.+").unwrap());

    let local = name.to_lowercase();
    let local = non_word.replace_all(&local, ".");
    let local = dots.replace_all(&local, ".");
    let local = local.trim_matches('.');

    format!("{local}@fantakombat.com")
}

fn check_headers(sheet: &str, row: &[Data], actions: &[Action], mismatches: &mut Vec<String>) {
    for (action_index, action) in actions.iter().enumerate() {
        let Some(cell) = row.get(FIRST_ACTION_COLUMN + action_index) else {
            continue;
        };
        let header = cell_to_raw(cell);
        if header.is_empty() {
            continue;
        }
        if let Some(declared) = base_points_in_header(&header) {
            if (declared - action.points).abs() > 1e-9 {
                mismatches.push(format!(
                    "sheet '{sheet}': column '{header}' declares {declared} pt, catalog has {} pt for '{}'",
                    action.points, action.name
                ));
            }
        }
    }
}

fn is_skip_name(name: &str) -> bool {
    SKIP_NAMES
        .iter()
        .any(|skip| skip.eq_ignore_ascii_case(name))
}

fn cell_to_raw(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Int(value) => value.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_to_number(data: &Data) -> Option<f64> {
    match data {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(text) => text.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sheets_are_detected_case_insensitively() {
        assert!(is_total_sheet("totale FANTAKombat"));
        assert!(is_total_sheet("TOTALE"));
        assert!(!is_total_sheet("13- 15 - 17 Gen 2025"));
    }

    #[test]
    fn roster_sentinels_are_skipped() {
        assert!(is_skip_name("Partecipante"));
        assert!(is_skip_name("TOTALE"));
        assert!(is_skip_name("tot"));
        assert!(!is_skip_name("Anna Rossi"));
    }

    #[test]
    fn cells_render_to_raw_text() {
        assert_eq!(cell_to_raw(&Data::Empty), "");
        assert_eq!(cell_to_raw(&Data::String("  v ".to_string())), "v");
        assert_eq!(cell_to_raw(&Data::Float(2.0)), "2");
        assert_eq!(cell_to_raw(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_raw(&Data::Int(3)), "3");
    }

    #[test]
    fn header_points_parse_both_separators() {
        assert_eq!(base_points_in_header("Presenza (+1pt)"), Some(1.0));
        assert_eq!(base_points_in_header("Assenza (-0,5pt)"), Some(-0.5));
        assert_eq!(base_points_in_header("Sacco con Angy (+0.5pt)"), Some(0.5));
        assert_eq!(base_points_in_header("Jolly notaio"), None);
    }

    #[test]
    fn emails_collapse_names_to_dotted_locals() {
        assert_eq!(student_email("Anna Rossi"), "anna.rossi@fantakombat.com");
        assert_eq!(
            student_email("  Gigi  D'Alessio "),
            "gigi.d.alessio@fantakombat.com"
        );
    }
}

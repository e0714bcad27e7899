use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::models::{Action, CellRow, ScoreEntry, StudentTotal, WeekScore};

/// Textual shapes recognized in score cells, in match priority order.
/// Cells are hand-entered; anything that fits none of these counts as zero.
#[derive(Debug, Clone, PartialEq)]
pub enum CellShape {
    Blank,
    MarkerRun(u32),
    Numeric(f64),
    Additive(Vec<Operand>),
    MinusRun(u32),
    WeekCount(u32),
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Marker,
    Literal(f64),
}

#[derive(Debug, Clone)]
pub struct UnrecognizedCell {
    pub student: String,
    pub week: u32,
    pub action: String,
    pub raw: String,
}

#[derive(Debug, Default)]
pub struct Scoreboard {
    pub weekly: IndexMap<String, IndexMap<u32, WeekScore>>,
    pub unrecognized: Vec<UnrecognizedCell>,
}

pub fn classify(raw: &str) -> CellShape {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellShape::Blank;
    }

    let lower = trimmed.to_lowercase();
    if lower == "nan" {
        return CellShape::Blank;
    }

    // Checkmark run: only markers, contiguous or joined by '+'. "v", "vv", "v+v".
    let markers: String = lower
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .collect();
    if !markers.is_empty() && markers.chars().all(|c| c == 'v') {
        return CellShape::MarkerRun(markers.len() as u32);
    }

    // A bare number in the cell is authoritative, whatever the column says.
    if let Some(value) = parse_literal(&lower) {
        return CellShape::Numeric(value);
    }

    if lower.contains('+') {
        let mut operands = Vec::new();
        for part in lower.split('+') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.chars().all(|c| c == 'v') {
                operands.extend(part.chars().map(|_| Operand::Marker));
            } else if let Some(value) = parse_literal(part) {
                operands.push(Operand::Literal(value));
            }
        }
        if !operands.is_empty() {
            return CellShape::Additive(operands);
        }
    }

    if trimmed.chars().all(|c| c == '-') {
        return CellShape::MinusRun(trimmed.len() as u32);
    }

    if let Some(weeks) = week_count(&lower) {
        return CellShape::WeekCount(weeks);
    }

    CellShape::Unrecognized
}

/// Normalize one cell into a signed point contribution. Total: never fails,
/// unrecognized input degrades to zero.
pub fn cell_points(raw: &str, base_points: f64) -> f64 {
    match classify(raw) {
        CellShape::Blank | CellShape::Unrecognized => 0.0,
        CellShape::MarkerRun(count) => count as f64 * base_points,
        CellShape::Numeric(value) => value,
        CellShape::Additive(operands) => operands
            .iter()
            .map(|operand| match operand {
                Operand::Marker => base_points,
                Operand::Literal(value) => *value,
            })
            .sum(),
        CellShape::MinusRun(count) => count as f64 * base_points.abs() * -1.0,
        CellShape::WeekCount(weeks) => {
            if base_points >= 0.0 {
                weekly_bonus_points(weeks)
            } else {
                weekly_malus_points(weeks)
            }
        }
    }
}

pub fn weekly_bonus_points(weeks: u32) -> f64 {
    match weeks {
        1 => 0.5,
        2 => 1.0,
        3 => 2.0,
        4 => 3.0,
        n => 0.5 * n as f64,
    }
}

pub fn weekly_malus_points(weeks: u32) -> f64 {
    match weeks {
        1 => -0.5,
        2 => -1.0,
        3 => -1.5,
        4 => -2.0,
        n => -0.5 * n as f64,
    }
}

/// Fold raw cells into per-student weekly scores. Students and weeks keep
/// first-seen workbook order; only non-zero contributions become entries.
pub fn score_rows(rows: &[CellRow], actions: &[Action]) -> Scoreboard {
    let mut board = Scoreboard::default();

    for row in rows {
        let Some(action) = actions.get(row.action_index) else {
            continue;
        };

        let week_scores = board.weekly.entry(row.student.clone()).or_default();
        let score = week_scores.entry(row.week).or_insert_with(|| WeekScore {
            actions: Vec::new(),
            total: 0.0,
        });

        if classify(&row.raw) == CellShape::Unrecognized {
            board.unrecognized.push(UnrecognizedCell {
                student: row.student.clone(),
                week: row.week,
                action: action.name.clone(),
                raw: row.raw.clone(),
            });
            continue;
        }

        let points = cell_points(&row.raw, action.points);
        if points != 0.0 {
            score.actions.push(ScoreEntry {
                action: action.name.clone(),
                value: row.raw.trim().to_string(),
                points,
            });
            score.total += points;
        }
    }

    board
}

/// Final ranking: descending by total, ties keep first-seen order.
pub fn rank_totals(board: &Scoreboard) -> Vec<StudentTotal> {
    let mut totals: Vec<StudentTotal> = board
        .weekly
        .iter()
        .map(|(student, weeks)| StudentTotal {
            name: student.clone(),
            total_points: weeks.values().map(|score| score.total).sum(),
            ranking: 0,
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total_points
            .partial_cmp(&a.total_points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (index, total) in totals.iter_mut().enumerate() {
        total.ranking = index + 1;
    }

    totals
}

fn parse_literal(value: &str) -> Option<f64> {
    let normalized = value.replace(',', ".");
    let digits = normalized.strip_prefix('-').unwrap_or(&normalized);

    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if digits.matches('.').count() > 1 {
        return None;
    }

    normalized.parse().ok()
}

fn week_count(value: &str) -> Option<u32> {
    static WEEK_RE: OnceLock<Regex> = OnceLock::new();
    let re = WEEK_RE.get_or_init(|| Regex::new(r"(\d+)\s*settiman[ae]").unwrap());
    re.captures(value)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_actions;

    #[test]
    fn blank_and_missing_values_yield_zero() {
        assert_eq!(cell_points("", 1.0), 0.0);
        assert_eq!(cell_points("   ", -0.5), 0.0);
        assert_eq!(cell_points("nan", 1.0), 0.0);
        assert_eq!(cell_points("NaN", 0.5), 0.0);
    }

    #[test]
    fn marker_runs_scale_with_base_points() {
        for count in 1..=4u32 {
            let raw = "v".repeat(count as usize);
            assert_eq!(cell_points(&raw, 1.0), count as f64);
            assert_eq!(cell_points(&raw, 0.5), count as f64 * 0.5);
            assert_eq!(cell_points(&raw, -0.5), count as f64 * -0.5);
        }
        assert_eq!(cell_points("v", 1.0), 1.0);
        assert_eq!(cell_points("v+v", 1.0), 2.0);
        assert_eq!(cell_points("V+V", 0.5), 1.0);
    }

    #[test]
    fn literal_numbers_override_base_points() {
        assert_eq!(cell_points("2", -0.5), 2.0);
        assert_eq!(cell_points("-0,5", 1.0), -0.5);
        assert_eq!(cell_points("1,5", -1.0), 1.5);
        assert_eq!(cell_points("0", 1.0), 0.0);
    }

    #[test]
    fn additive_expressions_sum_operands() {
        assert_eq!(cell_points("1+1+1", 99.0), 3.0);
        assert_eq!(cell_points("v+1", 0.5), 1.5);
        assert_eq!(cell_points("0,5+v", 1.0), 1.5);
        assert_eq!(cell_points("1+vv", 0.5), 2.0);
    }

    #[test]
    fn minus_runs_count_against_base_magnitude() {
        assert_eq!(cell_points("--", -0.5), -1.0);
        assert_eq!(cell_points("-", 1.0), -1.0);
        assert_eq!(cell_points("---", 0.5), -1.5);
    }

    #[test]
    fn week_annotations_use_lookup_tables() {
        assert_eq!(cell_points("dopo 3 settimane", 0.5), 2.0);
        assert_eq!(cell_points("dopo 3 settimane", -0.5), -1.5);
        assert_eq!(cell_points("1 settimana", 0.5), 0.5);
        assert_eq!(cell_points("1 settimana", -0.5), -0.5);
        assert_eq!(cell_points("dopo 4 settimane", 0.5), 3.0);
        assert_eq!(cell_points("dopo 4 settimane", -0.5), -2.0);
        // Beyond the table the fallback is linear.
        assert_eq!(cell_points("6 settimane", 0.5), 3.0);
        assert_eq!(cell_points("6 settimane", -0.5), -3.0);
    }

    #[test]
    fn unrecognized_text_yields_zero() {
        assert_eq!(cell_points("???", 1.0), 0.0);
        assert_eq!(cell_points("ok", -0.5), 0.0);
        assert_eq!(cell_points("a+b", 1.0), 0.0);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["v", "v+v", "-0,5", "--", "dopo 2 settimane", "???"] {
            assert_eq!(cell_points(raw, 0.5), cell_points(raw, 0.5), "{raw}");
        }
    }

    #[test]
    fn shapes_are_mutually_exclusive() {
        assert_eq!(classify("v"), CellShape::MarkerRun(1));
        assert_eq!(classify("2"), CellShape::Numeric(2.0));
        assert_eq!(classify("v2"), CellShape::Unrecognized);
        assert_eq!(classify("--"), CellShape::MinusRun(2));
        assert_eq!(classify("dopo 2 settimane"), CellShape::WeekCount(2));
        assert!(matches!(classify("v+1"), CellShape::Additive(_)));
    }

    fn row(student: &str, week: u32, action_index: usize, raw: &str) -> CellRow {
        CellRow {
            student: student.to_string(),
            week,
            action_index,
            raw: raw.to_string(),
        }
    }

    #[test]
    fn scores_accumulate_by_student_and_week() {
        let actions = default_actions();
        let rows = vec![
            row("Anna", 1, 0, "v"),
            row("Anna", 1, 1, "v"),
            row("Anna", 2, 0, "v+v"),
            row("Bruno", 1, 0, "v"),
        ];

        let board = score_rows(&rows, &actions);
        assert_eq!(board.weekly.len(), 2);

        let anna = &board.weekly["Anna"];
        assert_eq!(anna[&1].total, 0.5); // presenza +1, assenza -0.5
        assert_eq!(anna[&1].actions.len(), 2);
        assert_eq!(anna[&2].total, 2.0);

        let bruno = &board.weekly["Bruno"];
        assert_eq!(bruno[&1].total, 1.0);
    }

    #[test]
    fn zero_contributions_produce_no_entries() {
        let actions = default_actions();
        let rows = vec![row("Anna", 1, 0, ""), row("Anna", 1, 1, "0")];

        let board = score_rows(&rows, &actions);
        let week = &board.weekly["Anna"][&1];
        assert!(week.actions.is_empty());
        assert_eq!(week.total, 0.0);
    }

    #[test]
    fn unrecognized_cells_are_collected_not_scored() {
        let actions = default_actions();
        let rows = vec![row("Anna", 1, 0, "???"), row("Anna", 1, 0, "v")];

        let board = score_rows(&rows, &actions);
        assert_eq!(board.unrecognized.len(), 1);
        assert_eq!(board.unrecognized[0].raw, "???");
        assert_eq!(board.weekly["Anna"][&1].total, 1.0);
    }

    #[test]
    fn rankings_sort_descending_with_stable_ties() {
        let actions = default_actions();
        let rows = vec![
            row("Anna", 1, 0, "v"),
            row("Bruno", 1, 0, "v+v"),
            row("Carla", 1, 0, "v"),
        ];

        let board = score_rows(&rows, &actions);
        let totals = rank_totals(&board);

        assert_eq!(totals[0].name, "Bruno");
        assert_eq!(totals[0].ranking, 1);
        // Anna and Carla tie at 1.0; first-seen order wins.
        assert_eq!(totals[1].name, "Anna");
        assert_eq!(totals[2].name, "Carla");
        assert_eq!(totals[2].ranking, 3);
    }
}

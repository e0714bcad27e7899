use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Bonus,
    Malus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub points: f64,
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

/// One raw cell lifted out of a week sheet, before normalization.
#[derive(Debug, Clone)]
pub struct CellRow {
    pub student: String,
    pub week: u32,
    pub action_index: usize,
    pub raw: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub action: String,
    pub value: String,
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekScore {
    pub actions: Vec<ScoreEntry>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentTotal {
    pub name: String,
    pub total_points: f64,
    pub ranking: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub week: u32,
    pub lesson_number: u32,
    pub date: Option<NaiveDate>,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInfo {
    pub name: String,
    pub year: Option<i32>,
    pub lessons_per_week: u32,
    pub total_weeks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub extraction_date: DateTime<Utc>,
    pub source_file: String,
    pub course_info: CourseInfo,
    pub actions: Vec<Action>,
    pub students: Vec<Student>,
    pub lessons: Vec<Lesson>,
    pub weekly_scores: IndexMap<String, IndexMap<String, WeekScore>>,
    pub final_totals: Vec<StudentTotal>,
}

/// The twelve scoring actions in workbook column order (columns 2..=13).
pub fn default_actions() -> Vec<Action> {
    let catalog = [
        ("Presenza (+1pt)", 1.0, ActionKind::Bonus),
        ("Assenza (-0,5pt)", -0.5, ActionKind::Malus),
        ("Allenamento ottimale (+1pt)", 1.0, ActionKind::Bonus),
        ("Sacco con Angy (+0,5pt)", 0.5, ActionKind::Bonus),
        ("Footwork tutta la settimana (+0,5pt)", 0.5, ActionKind::Bonus),
        ("Punti extra settimana (presenza)", 0.5, ActionKind::Bonus),
        ("Jolly notaio (+1pt dal mese)", 1.0, ActionKind::Bonus),
        ("Ritardo Inizio Lezione (-0,5pt)", -0.5, ActionKind::Malus),
        ("Imbruttire ad Angy (-0,5pt)", -0.5, ActionKind::Malus),
        ("Non Urlo tutta la settimana (-0,5pt)", -0.5, ActionKind::Malus),
        ("Allenamento Schifoso (-0,5pt)", -0.5, ActionKind::Malus),
        ("Punti extra settimana (seguito)", -0.5, ActionKind::Malus),
    ];

    catalog
        .into_iter()
        .map(|(name, points, kind)| Action {
            name: name.to_string(),
            points,
            kind,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_signs_match_categories() {
        for action in default_actions() {
            match action.kind {
                ActionKind::Bonus => assert!(action.points >= 0.0, "{}", action.name),
                ActionKind::Malus => assert!(action.points <= 0.0, "{}", action.name),
            }
        }
    }

    #[test]
    fn catalog_has_twelve_columns() {
        assert_eq!(default_actions().len(), 12);
    }
}

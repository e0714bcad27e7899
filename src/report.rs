use std::fmt::Write;

use crate::models::{ActionKind, Snapshot};

/// Action usage across the whole course: how many score entries each action
/// produced, most used first.
pub fn summarize_action_usage(snapshot: &Snapshot) -> Vec<(String, usize)> {
    let mut usage: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for weeks in snapshot.weekly_scores.values() {
        for score in weeks.values() {
            for entry in &score.actions {
                *usage.entry(entry.action.clone()).or_insert(0) += 1;
            }
        }
    }

    let mut counts: Vec<(String, usize)> = usage.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

pub fn build_report(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}", "=".repeat(80));
    let _ = writeln!(output, "REPORT FANTAKOMBAT");
    let _ = writeln!(output, "{}", "=".repeat(80));
    let _ = writeln!(
        output,
        "Generato il: {}",
        snapshot.extraction_date.format("%d/%m/%Y %H:%M:%S")
    );
    let _ = writeln!(output, "File sorgente: {}", snapshot.source_file);
    let _ = writeln!(output);

    let _ = writeln!(output, "INFORMAZIONI CORSO");
    let _ = writeln!(output, "{}", "-".repeat(40));
    let _ = writeln!(output, "Nome: {}", snapshot.course_info.name);
    if let Some(year) = snapshot.course_info.year {
        let _ = writeln!(output, "Anno: {year}");
    }
    let _ = writeln!(
        output,
        "Lezioni per settimana: {}",
        snapshot.course_info.lessons_per_week
    );
    let _ = writeln!(
        output,
        "Settimane totali: {}",
        snapshot.course_info.total_weeks
    );
    let _ = writeln!(output, "Lezioni totali: {}", snapshot.lessons.len());
    let _ = writeln!(output);

    let _ = writeln!(output, "ELENCO STUDENTI");
    let _ = writeln!(output, "{}", "-".repeat(40));
    for (index, student) in snapshot.students.iter().enumerate() {
        let _ = writeln!(output, "{:2}. {}", index + 1, student.name);
    }
    let _ = writeln!(output, "Totale studenti: {}", snapshot.students.len());
    let _ = writeln!(output);

    let _ = writeln!(output, "AZIONI E PUNTEGGI");
    let _ = writeln!(output, "{}", "-".repeat(40));
    let _ = writeln!(output, "BONUS:");
    for action in &snapshot.actions {
        if action.kind == ActionKind::Bonus {
            let _ = writeln!(output, "  - {}: +{} punti", action.name, action.points);
        }
    }
    let _ = writeln!(output, "MALUS:");
    for action in &snapshot.actions {
        if action.kind == ActionKind::Malus {
            let _ = writeln!(output, "  - {}: {} punti", action.name, action.points);
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "CLASSIFICA FINALE");
    let _ = writeln!(output, "{}", "-".repeat(40));
    if snapshot.final_totals.is_empty() {
        let _ = writeln!(output, "Nessun punteggio registrato.");
    } else {
        for total in &snapshot.final_totals {
            let _ = writeln!(
                output,
                "{:2}. {:<25} {:>8.1} punti",
                total.ranking, total.name, total.total_points
            );
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "DISTRIBUZIONE AZIONI");
    let _ = writeln!(output, "{}", "-".repeat(40));
    for (action, count) in summarize_action_usage(snapshot) {
        let _ = writeln!(output, "- {action}: {count} volte");
    }
    let _ = writeln!(output);

    write_statistics(&mut output, snapshot);
    write_top_five_trends(&mut output, snapshot);

    let _ = writeln!(output, "{}", "=".repeat(80));
    output
}

fn write_statistics(output: &mut String, snapshot: &Snapshot) {
    let _ = writeln!(output, "STATISTICHE");
    let _ = writeln!(output, "{}", "-".repeat(40));

    let points: Vec<f64> = snapshot
        .final_totals
        .iter()
        .map(|total| total.total_points)
        .collect();

    if points.is_empty() {
        let _ = writeln!(output, "Nessun punteggio registrato.");
        let _ = writeln!(output);
        return;
    }

    let max = points.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = points.iter().cloned().fold(f64::INFINITY, f64::min);
    let avg = points.iter().sum::<f64>() / points.len() as f64;

    let _ = writeln!(output, "Punteggio massimo: {max:.1} punti");
    let _ = writeln!(output, "Punteggio minimo: {min:.1} punti");
    let _ = writeln!(output, "Punteggio medio: {avg:.1} punti");
    let _ = writeln!(
        output,
        "Studenti con punteggio positivo: {}",
        points.iter().filter(|p| **p > 0.0).count()
    );
    let _ = writeln!(
        output,
        "Studenti con punteggio negativo: {}",
        points.iter().filter(|p| **p < 0.0).count()
    );
    let _ = writeln!(
        output,
        "Studenti con punteggio zero: {}",
        points.iter().filter(|p| **p == 0.0).count()
    );
    let _ = writeln!(output);
}

fn write_top_five_trends(output: &mut String, snapshot: &Snapshot) {
    let _ = writeln!(output, "ANDAMENTO SETTIMANALE TOP 5");
    let _ = writeln!(output, "{}", "-".repeat(40));

    for total in snapshot.final_totals.iter().take(5) {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}. {}:", total.ranking, total.name);

        let Some(weeks) = snapshot.weekly_scores.get(&total.name) else {
            continue;
        };

        let mut active_weeks: Vec<f64> = Vec::new();
        for week in 1..=snapshot.course_info.total_weeks {
            let key = format!("week_{week}");
            if let Some(score) = weeks.get(&key) {
                if score.total != 0.0 {
                    let _ = writeln!(
                        output,
                        "   Settimana {week:2}: {:>6.1} punti",
                        score.total
                    );
                    active_weeks.push(score.total);
                }
            }
        }

        if !active_weeks.is_empty() {
            let best = active_weeks.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let worst = active_weeks.iter().cloned().fold(f64::INFINITY, f64::min);
            let avg = active_weeks.iter().sum::<f64>() / active_weeks.len() as f64;
            let _ = writeln!(output, "   Migliore settimana: {best:.1} punti");
            let _ = writeln!(output, "   Peggiore settimana: {worst:.1} punti");
            let _ = writeln!(output, "   Media settimanale: {avg:.1} punti");
        }
    }

    let _ = writeln!(output);
}

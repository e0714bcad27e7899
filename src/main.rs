use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

mod calendar;
mod models;
mod points;
mod report;
mod sheet;

use models::Action;
use points::Scoreboard;
use sheet::CourseSheets;

#[derive(Parser)]
#[command(name = "fantakombat-extract")]
#[command(about = "Score extraction for the FantaKombat Fit&Box course game", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all scores from the workbook into a JSON snapshot
    Extract {
        #[arg(long)]
        xlsx: PathBuf,
        #[arg(long, default_value = "fantakombat_data.json")]
        out: PathBuf,
    },
    /// Print the final ranking, or one student's weekly breakdown
    Score {
        #[arg(long)]
        xlsx: PathBuf,
        #[arg(long)]
        student: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a text report
    Report {
        #[arg(long)]
        xlsx: PathBuf,
        #[arg(long, default_value = "fantakombat_report.txt")]
        out: PathBuf,
    },
    /// Export every non-zero score entry as CSV
    ExportCsv {
        #[arg(long)]
        xlsx: PathBuf,
        #[arg(long, default_value = "fantakombat_entries.csv")]
        out: PathBuf,
    },
    /// Compare computed totals against the workbook's totale sheet
    Verify {
        #[arg(long)]
        xlsx: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { xlsx, out } => {
            let (actions, course, board) = load_course(&xlsx)?;
            let snapshot = sheet::build_snapshot(&source_name(&xlsx), &actions, &course, &board);
            std::fs::write(&out, serde_json::to_string_pretty(&snapshot)?)?;
            println!("Snapshot written to {}.", out.display());
            println!(
                "{} students, {} lessons, {} weeks, {} actions.",
                snapshot.students.len(),
                snapshot.lessons.len(),
                snapshot.course_info.total_weeks,
                snapshot.actions.len()
            );
        }
        Commands::Score {
            xlsx,
            student,
            limit,
        } => {
            let (_, _, board) = load_course(&xlsx)?;

            match student {
                Some(name) => match board.weekly.get(&name) {
                    None => println!("No scores found for {name}."),
                    Some(weeks) => {
                        println!("Weekly scores for {name}:");
                        let mut total = 0.0;
                        for (week, score) in weeks {
                            total += score.total;
                            if !score.actions.is_empty() {
                                println!(
                                    "- week {week}: {:.1} points across {} entries",
                                    score.total,
                                    score.actions.len()
                                );
                            }
                        }
                        println!("Total: {total:.1} points across {} weeks.", weeks.len());
                    }
                },
                None => {
                    let totals = points::rank_totals(&board);
                    if totals.is_empty() {
                        println!("No scores found in this workbook.");
                        return Ok(());
                    }
                    println!("Final ranking:");
                    for total in totals.iter().take(limit) {
                        println!(
                            "{:2}. {} - {:.1} points",
                            total.ranking, total.name, total.total_points
                        );
                    }
                }
            }
        }
        Commands::Report { xlsx, out } => {
            let (actions, course, board) = load_course(&xlsx)?;
            let snapshot = sheet::build_snapshot(&source_name(&xlsx), &actions, &course, &board);
            std::fs::write(&out, report::build_report(&snapshot))?;
            println!("Report written to {}.", out.display());
        }
        Commands::ExportCsv { xlsx, out } => {
            let (_, _, board) = load_course(&xlsx)?;

            #[derive(serde::Serialize)]
            struct CsvEntry<'a> {
                student: &'a str,
                week: u32,
                action: &'a str,
                value: &'a str,
                points: f64,
            }

            let mut writer = csv::Writer::from_path(&out)?;
            let mut exported = 0usize;
            for (student, weeks) in &board.weekly {
                for (week, score) in weeks {
                    for entry in &score.actions {
                        writer.serialize(CsvEntry {
                            student,
                            week: *week,
                            action: &entry.action,
                            value: &entry.value,
                            points: entry.points,
                        })?;
                        exported += 1;
                    }
                }
            }
            writer.flush()?;
            println!("Exported {exported} entries to {}.", out.display());
        }
        Commands::Verify { xlsx } => {
            let (_, course, board) = load_course(&xlsx)?;
            let mut workbook = sheet::open_course_workbook(&xlsx)?;
            let reference = sheet::read_reference_totals(&mut workbook, course.total_weeks)?;

            let totals = points::rank_totals(&board);
            let computed: HashMap<&str, f64> = totals
                .iter()
                .map(|total| (total.name.as_str(), total.total_points))
                .collect();

            let mut discrepancies = 0usize;
            for (student, expected) in &reference {
                match computed.get(student.as_str()) {
                    Some(actual) if (actual - expected).abs() <= 0.01 => {}
                    Some(actual) => {
                        println!(
                            "- {student}: computed {actual:.1}, totale sheet has {expected:.1}"
                        );
                        discrepancies += 1;
                    }
                    None => {
                        println!(
                            "- {student}: missing from week sheets, totale sheet has {expected:.1}"
                        );
                        discrepancies += 1;
                    }
                }
            }
            for total in &totals {
                if !reference.iter().any(|(name, _)| name == &total.name) {
                    println!(
                        "- {}: not in totale sheet, computed {:.1}",
                        total.name, total.total_points
                    );
                    discrepancies += 1;
                }
            }

            if discrepancies == 0 {
                println!("All totals match the totale sheet.");
            } else {
                println!("{discrepancies} discrepancies found.");
            }
        }
    }

    Ok(())
}

fn load_course(xlsx: &Path) -> anyhow::Result<(Vec<Action>, CourseSheets, Scoreboard)> {
    let actions = models::default_actions();
    let mut workbook = sheet::open_course_workbook(xlsx)?;
    let course = sheet::read_week_sheets(&mut workbook, &actions)?;
    let board = points::score_rows(&course.rows, &actions);

    for warning in &course.header_mismatches {
        println!("warning: {warning}");
    }
    for cell in &board.unrecognized {
        println!(
            "warning: unrecognized value '{}' for {} (week {}, {}), counted as 0",
            cell.raw, cell.student, cell.week, cell.action
        );
    }

    Ok((actions, course, board))
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

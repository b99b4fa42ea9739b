use std::path::PathBuf;

use colored::*;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use stoolai::ClassificationResult;
use stoolai::error::ResourceError;

fn header(text: &str) -> Cell {
    Cell::new(text).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

fn confidence_color(confidence: f32) -> Color {
    if confidence >= 0.8 {
        Color::Green
    } else if confidence >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Builds the table printed by `classify`.
pub fn results_table(results: &[(PathBuf, ClassificationResult)]) -> Table {
    let mut table = Table::new();
    table
        .set_header(vec![header("File"), header("Predicted Type"), header("Confidence")])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for (path, result) in results {
        let file = Cell::new(path.display().to_string()).fg(Color::White);
        let row = match result {
            ClassificationResult::Prediction { predicted_type, confidence } => vec![
                file,
                Cell::new(predicted_type).fg(Color::Yellow).set_alignment(CellAlignment::Center),
                Cell::new(format!("{:.1}%", confidence * 100.0))
                    .fg(confidence_color(*confidence))
                    .set_alignment(CellAlignment::Right),
            ],
            ClassificationResult::Error { error } => vec![
                file,
                Cell::new(error).fg(Color::Red),
                Cell::new("-").fg(Color::DarkGrey).set_alignment(CellAlignment::Right),
            ],
        };
        table.add_row(row);
    }

    table
}

/// Prints classification results followed by a one-line summary.
pub fn display_results(results: &[(PathBuf, ClassificationResult)]) {
    println!("{}", results_table(results));

    let failed = results.iter().filter(|(_, r)| r.is_error()).count();
    let summary = format!("{} of {} images classified", results.len() - failed, results.len());
    if failed == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}

/// Prints the outcome of a resource mapping check.
pub fn display_verification(outcome: &Result<(), ResourceError>) {
    match outcome {
        Ok(()) => println!("{}", "All resources are mapped and present".green().bold()),
        Err(ResourceError::Mapping { missing, unmapped }) => {
            println!("{}", "Resource mapping check failed".red().bold());
            for path in missing {
                println!("  {} {}", "missing ".red(), path);
            }
            for path in unmapped {
                println!("  {} {}", "unmapped".yellow(), path);
            }
        }
        Err(e) => println!("{} {}", "Resource check failed:".red().bold(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_table_rows() {
        let results = vec![
            (
                PathBuf::from("a.png"),
                ClassificationResult::Prediction {
                    predicted_type: "type-4".to_string(),
                    confidence: 0.912,
                },
            ),
            (
                PathBuf::from("b.png"),
                ClassificationResult::error("Classification failed: bad image"),
            ),
        ];

        let rendered = results_table(&results).to_string();
        assert!(rendered.contains("a.png"));
        assert!(rendered.contains("type-4"));
        assert!(rendered.contains("91.2%"));
        assert!(rendered.contains("bad image"));
    }

    #[test]
    fn test_confidence_color_bands() {
        assert_eq!(confidence_color(0.95), Color::Green);
        assert_eq!(confidence_color(0.6), Color::Yellow);
        assert_eq!(confidence_color(0.2), Color::Red);
    }
}

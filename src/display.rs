use std::fs::File;
use std::io::Write;
use crate::lineup::{Lineup, OptimizationResponse};

/// Formats a player name with team tag
pub fn format_player_name(team: &str, name: &str) -> String {
    if team.is_empty() {
        name.to_string()
    } else {
        format!("[{}] {}", team, name)
    }
}

fn lineup_rows(lineup: &Lineup) -> Vec<String> {
    lineup
        .slots
        .iter()
        .map(|s| {
            format!(
                "{:<6} {:<32} {:>7} {:>7.2}  {:?}",
                s.slot_label,
                format_player_name(&s.team, &s.name),
                s.salary,
                s.score,
                s.source
            )
        })
        .collect()
}

/// Writes a lineup to a file, one slot per line, with totals at the end
pub fn write_lineup_to_file(lineup: &Lineup, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** Lineup **")?;
    for row in lineup_rows(lineup) {
        writeln!(file, "{}", row)?;
    }
    writeln!(file, "Total salary: {}", lineup.total_salary)?;
    writeln!(file, "Projected points: {:.2}", lineup.total_score)?;

    Ok(())
}

/// Prints a lineup in a readable format
pub fn print_lineup(lineup: &Lineup) {
    println!("\n=== Optimized Lineup ===");
    println!("{:<6} {:<32} {:>7} {:>7}  Source", "Slot", "Player", "Salary", "Proj");
    for row in lineup_rows(lineup) {
        println!("  {}", row);
    }
    println!("\nTotal salary: {}", lineup.total_salary);
    println!("Projected points: {:.2}", lineup.total_score);
}

/// Prints a failed response with its kind
pub fn print_failure(response: &OptimizationResponse) {
    println!("\n=== Optimization Failed ===");
    if let Some(kind) = &response.error_kind {
        println!("Reason: {}", kind);
    }
    println!("{}", response.message);
}

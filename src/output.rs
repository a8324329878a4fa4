use crate::classify::Tier;
use crate::model::{AnalysisOutput, ProductivityComparison, WindowSummary};
use anyhow::Result;
use console::style;
use std::fmt::Write as _;

pub fn output_json(output: &AnalysisOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

pub fn output_report(output: &AnalysisOutput, verbose: bool) -> Result<()> {
    print!("{}", render_report(output, verbose)?);
    Ok(())
}

fn rate(summary: &WindowSummary) -> String {
    format!("{:.1}", summary.daily_rate)
}

fn change(cmp: &ProductivityComparison) -> String {
    match cmp.percentage_change {
        Some(pct) => format!("{pct:+.1}%"),
        None => "N/A".to_string(),
    }
}

fn multiplier(cmp: &ProductivityComparison) -> String {
    match cmp.multiplier {
        Some(m) => format!("{m:.1}x"),
        None => "N/A".to_string(),
    }
}

pub fn render_report(out: &AnalysisOutput, verbose: bool) -> Result<String> {
    let mut s = String::new();
    let tool = &out.tool;
    let (before, after) = (&out.before, &out.after);

    writeln!(s, "\n{}", style("AI Coding Productivity Report").bold())?;
    writeln!(s, "Tool: {tool}")?;
    if before.window.day_count == after.window.day_count {
        writeln!(
            s,
            "Analysis Period: {} days before/after ({})",
            before.window.day_count, out.timezone
        )?;
    } else {
        writeln!(
            s,
            "Analysis Period: {} days before, {} days after ({})",
            before.window.day_count, after.window.day_count, out.timezone
        )?;
    }
    writeln!(s, "Adoption Date: {}", out.adoption_date)?;
    writeln!(s, "{}", "─".repeat(60))?;

    writeln!(s, "\n{}", style("CORE RESULTS").bold())?;
    for (label, summary) in [("Before", before), ("After", after)] {
        writeln!(
            s,
            "{label} {tool}: {} commits in {} days ({}/day)",
            style(summary.commit_count).cyan(),
            summary.window.day_count,
            rate(summary)
        )?;
    }
    match out.comparison.percentage_change {
        Some(_) => writeln!(
            s,
            "Productivity change: {} ({} multiplier)",
            style(change(&out.comparison)).green(),
            multiplier(&out.comparison)
        )?,
        None => writeln!(s, "Productivity change: N/A (no commits before adoption)")?,
    }

    if verbose {
        render_details(&mut s, out)?;
    }

    writeln!(s, "\n{}", style("SUMMARY").bold())?;
    writeln!(s, "Started using {tool} on {}", out.adoption_date)?;
    writeln!(
        s,
        "Commit frequency: {} → {} commits/day ({})",
        rate(before),
        rate(after),
        change(&out.comparison)
    )?;
    writeln!(s, "Productivity multiplier: {}", multiplier(&out.comparison))?;
    if verbose {
        writeln!(
            s,
            "Complex feature commits: {} → {}",
            before.complexity.high, after.complexity.high
        )?;
    }
    writeln!(s, "Repository: {}", out.repository)?;

    writeln!(s, "\n{}", style("HOW OTHERS CAN VERIFY").bold())?;
    writeln!(s, "Run these commands in the repository:")?;
    for cmd in &out.verification {
        writeln!(s, "{}", style(cmd).dim())?;
    }

    if !out.warnings.is_empty() {
        writeln!(s, "\n{}", style("WARNINGS").yellow().bold())?;
        for w in &out.warnings {
            writeln!(s, "  • {w}")?;
        }
    }

    if !verbose {
        writeln!(s, "\nWant detailed analysis? Run with --verbose")?;
    }
    Ok(s)
}

fn render_details(s: &mut String, out: &AnalysisOutput) -> Result<()> {
    let tool = &out.tool;
    let sides = [("Before", &out.before), ("After", &out.after)];

    writeln!(s, "\n{}", style("DETAILED METRICS").bold())?;
    for (label, summary) in sides {
        writeln!(s, "{label} {tool}:")?;
        writeln!(s, "  • Lines added: {}", style(summary.lines.insertions).green())?;
        writeln!(s, "  • Lines removed: {}", style(summary.lines.deletions).red())?;
        if summary.lines.binary_files_skipped > 0 {
            writeln!(
                s,
                "  • Binary file changes (not counted): {}",
                summary.lines.binary_files_skipped
            )?;
        }
    }

    writeln!(s, "\n{}", style("COMMIT COMPLEXITY").bold())?;
    for (label, summary) in sides {
        writeln!(s, "{label} {tool}:")?;
        for tier in Tier::ALL {
            writeln!(
                s,
                "  • {} complexity: {} ({:.1}%)",
                capitalize(tier.label()),
                summary.complexity.get(tier),
                summary.complexity.share(tier)
            )?;
        }
    }

    writeln!(s, "\n{}", style("MOST PRODUCTIVE DAYS").bold())?;
    for (label, summary) in sides {
        writeln!(s, "{label}:")?;
        for day in &summary.top_days {
            writeln!(s, "  • {}: {} commits", day.date, day.commits)?;
        }
    }

    writeln!(s, "\n{}", style("MOST CHANGED FILES").bold())?;
    for (label, summary) in sides {
        writeln!(s, "{label} (top {}):", summary.top_files.len())?;
        for file in &summary.top_files {
            writeln!(s, "  • {}: {} changes", file.path, file.changes)?;
        }
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

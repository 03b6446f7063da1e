use anyhow::Result;
use chrono::NaiveDate;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use streakdex_core::{DayCount, EarnedReward, Frequency, ProgressStats, Rarity};

use crate::simulate::SimulationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored, human-readable output
    Console,
    /// Pretty-printed JSON on stdout
    Json,
}

/// One line of the habit list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub goal_per_period: u32,
    pub done_today: u32,
    pub streak: u32,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDetail {
    #[serde(flatten)]
    pub row: HabitRow,
    pub created_on: NaiveDate,
    pub history: Vec<DayCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionStatus {
    Recorded,
    GoalAlreadyMet,
    UnknownHabit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub habit_id: String,
    pub title: String,
    pub status: CompletionStatus,
    pub day: NaiveDate,
    pub count: u32,
    pub goal_per_period: u32,
    pub streak: u32,
    pub xp: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<EarnedReward>,
}

/// One earned reward with whatever metadata the lookup could provide.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDetail {
    pub id: u32,
    pub name: String,
    pub rarity: Rarity,
    pub earned_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json_output = serde_json::to_string_pretty(value)?;
    println!("{json_output}");
    Ok(())
}

fn rarity_label(rarity: Rarity) -> colored::ColoredString {
    match rarity {
        Rarity::Common => rarity.as_str().normal(),
        Rarity::Rare => rarity.as_str().bright_blue().bold(),
        Rarity::Legendary => rarity.as_str().bright_yellow().bold(),
    }
}

fn goal_marker(done: u32, goal: u32) -> colored::ColoredString {
    let text = format!("{done}/{goal}");
    if done >= goal { text.green() } else { text.yellow() }
}

/// Confirmation line for commands that only mutate.
pub fn print_message(format: ReportFormat, action: &str, id: &str) -> Result<()> {
    match format {
        ReportFormat::Console => {
            println!("{} {action} {}", "✔".green(), id.bold());
            Ok(())
        }
        ReportFormat::Json => print_json(&serde_json::json!({ "action": action, "id": id })),
    }
}

pub fn print_habits(format: ReportFormat, rows: &[HabitRow]) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(rows);
    }
    if rows.is_empty() {
        println!("No habits yet. Add one with `streakdex add <title>`.");
        return Ok(());
    }
    println!("{}", "📋 Habits".bright_cyan().bold());
    println!("{}", "=========".cyan());
    for row in rows {
        let short_id: String = row.id.chars().take(8).collect();
        let title = if row.archived {
            format!("{} (archived)", row.title).dimmed()
        } else {
            row.title.bold()
        };
        println!(
            "{} {title}  today {}  streak {}  [{}]",
            short_id.dimmed(),
            goal_marker(row.done_today, row.goal_per_period),
            row.streak.to_string().bright_magenta(),
            row.frequency
        );
    }
    Ok(())
}

pub fn print_habit_detail(format: ReportFormat, detail: &HabitDetail) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(detail);
    }
    let row = &detail.row;
    println!("{}", row.title.bright_cyan().bold());
    if let Some(description) = &row.description {
        println!("  {description}");
    }
    println!("  id:        {}", row.id);
    println!("  created:   {}", detail.created_on);
    println!("  frequency: {} (goal {})", row.frequency, row.goal_per_period);
    println!("  streak:    {}", row.streak);
    if row.archived {
        println!("  {}", "archived".dimmed());
    }
    println!();
    for entry in &detail.history {
        let bar = "■".repeat(usize::try_from(entry.count).unwrap_or(usize::MAX).min(20));
        println!(
            "  {}  {}",
            entry.day,
            if entry.count >= row.goal_per_period {
                bar.green()
            } else {
                bar.yellow()
            }
        );
    }
    Ok(())
}

pub fn print_completion(format: ReportFormat, report: &CompletionReport) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(report);
    }
    match report.status {
        CompletionStatus::UnknownHabit => {
            eprintln!("⚠️  Unknown habit: {}", report.habit_id.yellow());
            return Ok(());
        }
        CompletionStatus::GoalAlreadyMet => println!(
            "{} already met today's goal ({})",
            report.title.bold(),
            goal_marker(report.count, report.goal_per_period)
        ),
        CompletionStatus::Recorded => println!(
            "{} {} {}  streak {}  xp {}",
            "✔".green(),
            report.title.bold(),
            goal_marker(report.count, report.goal_per_period),
            report.streak.to_string().bright_magenta(),
            report.xp.to_string().bright_cyan()
        ),
    }
    if let Some(reward) = &report.reward {
        println!(
            "🎉 New reward: {} #{} ({})",
            reward.name.bold(),
            reward.id,
            rarity_label(reward.rarity)
        );
    }
    Ok(())
}

pub fn print_stats(format: ReportFormat, stats: &ProgressStats) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(stats);
    }
    println!("{}", "📊 Progress".bright_cyan().bold());
    println!("{}", "===========".cyan());
    println!("Total XP:          {}", stats.total_xp.to_string().bright_cyan());
    println!("Completions (7d):  {}", stats.weekly_completions);
    println!(
        "Rewards:           {} ({} common, {} rare, {} legendary)",
        stats.earned_total, stats.common, stats.rare, stats.legendary
    );
    match stats.next_unlock_xp {
        Some(xp) => println!("Next unlock at:    {xp} XP"),
        None => println!("Next unlock at:    {}", "catalog complete".green()),
    }
    Ok(())
}

pub fn print_rewards(format: ReportFormat, rewards: &[&EarnedReward]) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(rewards);
    }
    if rewards.is_empty() {
        println!("No rewards earned yet.");
        return Ok(());
    }
    println!("{}", "🏆 Collection".bright_cyan().bold());
    println!("{}", "=============".cyan());
    for reward in rewards {
        println!(
            "#{:<4} {:<20} {}  {}",
            reward.id,
            reward.name,
            rarity_label(reward.rarity),
            reward.earned_at.date_naive()
        );
    }
    Ok(())
}

pub fn print_reward_detail(format: ReportFormat, detail: &RewardDetail) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(detail);
    }
    println!("{} #{}", detail.name.bright_cyan().bold(), detail.id);
    println!("  rarity:  {}", rarity_label(detail.rarity));
    println!("  earned:  {}", detail.earned_on);
    match &detail.image_url {
        Some(url) => println!("  artwork: {url}"),
        None => println!("  artwork: {}", "unavailable".dimmed()),
    }
    Ok(())
}

pub fn print_simulation(format: ReportFormat, report: &SimulationReport) -> Result<()> {
    if format == ReportFormat::Json {
        return print_json(report);
    }
    println!("{}", "🎲 Simulation".bright_cyan().bold());
    println!("{}", "=============".cyan());
    println!(
        "{} days from {} to {} (seed {}, miss rate {:.2})",
        report.days, report.start, report.end, report.seed, report.miss_rate
    );
    println!("Total XP:     {}", report.total_xp.to_string().bright_cyan());
    println!("Completions:  {}", report.completions);
    println!();
    for habit in &report.habits {
        println!(
            "{}  done {}  missed {}  streak {}  longest {}",
            habit.title.bold(),
            habit.completed_days.to_string().green(),
            habit.missed_days.to_string().red(),
            habit.final_streak,
            habit.longest_streak.to_string().bright_magenta()
        );
    }
    if !report.unlocks.is_empty() {
        println!();
        println!("{}", "Unlocks".bright_yellow().bold());
        for unlock in &report.unlocks {
            println!(
                "  {}  {:>5} XP  #{:<4} {}",
                unlock.day,
                unlock.xp,
                unlock.id,
                rarity_label(unlock.rarity)
            );
        }
    }
    Ok(())
}

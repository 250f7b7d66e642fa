//! Reply text for the command router.
//!
//! Plain ASCII blocks ready to drop into a messaging reply. The ledger hands
//! over numbers and labels; everything visual (bar width, layout) lives here.

use crate::ledger::{LearnOutcome, Recall, Standing};
use std::collections::BTreeSet;

/// Segments in the standing progress bar.
pub const BAR_SEGMENTS: usize = 10;

/// Fixed-width bar like `[####------]` from a fraction in [0, 1].
pub fn progress_bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_SEGMENTS as f64).round() as usize;
    let filled = filled.min(BAR_SEGMENTS);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_SEGMENTS - filled))
}

/// Standing reply: total, rank, and the road to the next rank.
pub fn format_standing(standing: &Standing) -> String {
    match &standing.next {
        Some(next) => format!(
            "XP: {}\nRank: {}\n{} {} / {} to {}",
            standing.xp,
            standing.rank,
            progress_bar(standing.progress),
            standing.xp,
            next.threshold,
            next.label
        ),
        None => format!(
            "XP: {}\nRank: {}\n{} max rank reached",
            standing.xp,
            standing.rank,
            progress_bar(standing.progress)
        ),
    }
}

/// Reply for a successful teach command.
pub fn format_learn(name: &str, outcome: &LearnOutcome) -> String {
    let verb = if outcome.replaced { "updated" } else { "saved" };
    let mut reply = format!(
        "Pattern '{}' {}. (+{} XP, total {}, rank {})",
        name, verb, outcome.awarded, outcome.xp, outcome.rank
    );
    if !outcome.unlocked.is_empty() {
        reply.push('\n');
        reply.push_str(&format_badge_unlocks(&outcome.unlocked));
    }
    reply
}

/// Reply for a recall command.
pub fn format_recall(name: &str, recall: &Recall) -> String {
    format!(
        "Pattern '{}':\n{}\n(+{} XP, total {}, rank {})",
        name, recall.body, recall.awarded, recall.xp, recall.rank
    )
}

/// Listing reply; tells the user when there is nothing stored yet.
pub fn format_patterns(patterns: &[(String, String)]) -> String {
    if patterns.is_empty() {
        return "You have no saved patterns.".to_string();
    }
    let mut lines = vec!["Your saved patterns:".to_string()];
    for (name, body) in patterns {
        lines.push(format!("  * {} - {}", name, body));
    }
    lines.join("\n")
}

/// One line per newly unlocked badge.
pub fn format_badge_unlocks(unlocked: &BTreeSet<String>) -> String {
    unlocked
        .iter()
        .map(|label| format!("[*] Badge unlocked: {}", label))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Badge inventory reply.
pub fn format_badges(badges: &BTreeSet<String>) -> String {
    if badges.is_empty() {
        return "No badges yet.".to_string();
    }
    let labels: Vec<&str> = badges.iter().map(String::as_str).collect();
    format!("Badges: {}", labels.join(", "))
}

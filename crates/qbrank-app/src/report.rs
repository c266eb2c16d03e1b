// Plain-text rendering of scoring results for stdout.

use qbrank_core::composer::{ClutchDetail, ScoreBreakdown};
use qbrank_core::weights::SCHEMA;
use std::fmt::Write;

fn score_cell(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.1}"),
        None => "-".to_string(),
    }
}

/// Ranked table: rank, name, team, overall, then one column per top-level
/// component. Components without data print as `-`.
pub fn render_rankings(scores: &[ScoreBreakdown]) -> String {
    let name_width = scores
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    let mut out = String::new();
    let _ = write!(out, "{:>4}  {:<name_width$}  {:<4}  {:>7}", "Rank", "Name", "Team", "Overall");
    for node in SCHEMA.iter() {
        let _ = write!(out, "  {:>10}", node.key);
    }
    out.push('\n');

    for (i, score) in scores.iter().enumerate() {
        let _ = write!(
            out,
            "{:>4}  {:<name_width$}  {:<4}  {:>7.1}",
            i + 1,
            score.name,
            score.team,
            score.overall
        );
        for node in SCHEMA.iter() {
            let cell = score_cell(score.component(node.key).and_then(|c| c.score));
            let _ = write!(out, "  {:>10}", cell);
        }
        out.push('\n');
    }
    out
}

/// One player's clutch categories next to the league means.
pub fn render_clutch(player_name: &str, details: &[ClutchDetail]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Clutch breakdown for {player_name}");
    for detail in details {
        let perf = &detail.performance;
        if !perf.has_data {
            let _ = writeln!(out, "  {:<16} no attempts", detail.name);
            continue;
        }
        let _ = writeln!(
            out,
            "  {:<16} score {:.3} (league {:.3}, {} qualified) over {:.0} attempts",
            detail.name,
            perf.normalized_score,
            detail.league.normalized_score.mean,
            detail.league.qualified_players,
            perf.total_attempts
        );
        for (kind, value) in &perf.metrics {
            let league = detail
                .league
                .mean(*kind)
                .map(|m| format!("{m:.3}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "    {:<22} {:>8.3}  league {:>8}", kind.key(), value, league);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbrank_core::composer::ComponentScore;

    fn component(key: &'static str, score: Option<f64>) -> ComponentScore {
        ComponentScore {
            key,
            weight: 0.0,
            effective_weight: 0.0,
            score,
            raw: None,
            children: Vec::new(),
        }
    }

    fn breakdown(name: &str, overall: f64, clutch: Option<f64>) -> ScoreBreakdown {
        ScoreBreakdown {
            player_id: name.to_lowercase(),
            name: name.into(),
            team: "KC".into(),
            season: 2023,
            eligible: true,
            overall,
            components: vec![
                component("team", Some(60.0)),
                component("stats", Some(70.25)),
                component("clutch", clutch),
                component("durability", Some(50.0)),
                component("support", Some(40.0)),
            ],
        }
    }

    #[test]
    fn table_has_header_and_ranked_rows() {
        let scores = vec![
            breakdown("Pat Arm", 71.44, Some(80.0)),
            breakdown("Backup", 40.0, None),
        ];
        let text = render_rankings(&scores);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Overall"));
        assert!(lines[0].contains("durability"));
        assert!(lines[1].trim_start().starts_with("1  Pat Arm"));
        assert!(lines[1].contains("71.4"));
        assert!(lines[1].contains("70.2") || lines[1].contains("70.3"));
        assert!(lines[2].trim_start().starts_with("2  Backup"));
        assert!(lines[2].contains(" -"));
    }

    #[test]
    fn empty_table_is_header_only() {
        assert_eq!(render_rankings(&[]).lines().count(), 1);
    }
}

//! Formatting for durations, startup banners and update summaries.

use hotbed_core::{UpdateDecision, UpdatePayload};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use hotbed_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One line per client-visible effect of a file change; `None` when the
/// change affected nothing.
pub fn describe_decision(decision: &UpdateDecision) -> Option<String> {
    match decision {
        UpdateDecision::Unused => None,
        UpdateDecision::FullReload { path } => Some(format!("page reload {}", path)),
        UpdateDecision::Updates(updates) => Some(
            updates
                .iter()
                .map(describe_payload)
                .collect::<Vec<_>>()
                .join(", "),
        ),
    }
}

fn describe_payload(payload: &UpdatePayload) -> String {
    match payload {
        UpdatePayload::Update { url, .. } => format!("hmr update {}", url),
        UpdatePayload::StyleUpdate { url, .. } => format!("css update {}", url),
        UpdatePayload::StyleRemove { id } => format!("css remove {}", id),
        other => other.kind().to_string(),
    }
}

/// Startup banner with the address and project root.
pub fn print_banner(url: &str, root: &std::path::Path, startup: Duration) {
    if !super::colors_enabled() {
        eprintln!("\n  hotbed ready in {}\n", format_duration(startup));
        eprintln!("  ➜ Local: {}", url);
        eprintln!("  ➜ Root:  {}\n", root.display());
        return;
    }
    eprintln!();
    eprintln!(
        "  {} {}",
        "hotbed".green().bold(),
        format!("ready in {}", format_duration(startup)).dimmed()
    );
    eprintln!();
    eprintln!("  {} {}", "➜ Local:".bold(), url.cyan());
    eprintln!("  {} {}", "➜ Root: ".bold(), root.display());
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_changes_are_silent() {
        assert_eq!(describe_decision(&UpdateDecision::Unused), None);
    }

    #[test]
    fn updates_are_listed_in_order() {
        let decision = UpdateDecision::Updates(vec![
            UpdatePayload::StyleUpdate {
                url: "/a.css".into(),
                id: "1".into(),
                timestamp: 1,
            },
            UpdatePayload::Update {
                url: "/b.ts".into(),
                timestamp: 1,
                accepted_path: "/b.ts".into(),
            },
        ]);
        assert_eq!(
            describe_decision(&decision).as_deref(),
            Some("css update /a.css, hmr update /b.ts")
        );
    }

    #[test]
    fn reload_names_the_path() {
        let decision = UpdateDecision::FullReload {
            path: "/index.html".into(),
        };
        assert_eq!(
            describe_decision(&decision).as_deref(),
            Some("page reload /index.html")
        );
    }
}

//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Data goes to stdout. Notifications go to stderr so piped output stays
//! parseable.

use serde::Serialize;

use marks_core::{Favorite, ImportReport, Notification, NotificationKind, Section, SectionView};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Skip confirmation prompts
    pub assume_yes: bool,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            assume_yes: false,
        }
    }

    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human && !self.assume_yes
    }

    /// Print a single section
    pub fn print_section(&self, section: &Section) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", section.id);
                println!("Title:      {}", section.title);
                println!("Position:   {}", section.rank + 1);
                println!(
                    "Colors:     {} on {}",
                    section.text_color, section.background_color
                );
                println!("Created:    {}", section.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:    {}", section.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(section),
            OutputFormat::Quiet => println!("{}", section.id),
        }
    }

    /// Print sections with the number of favorites in each
    pub fn print_sections(&self, sections: &[(Section, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if sections.is_empty() {
                    println!("No sections found.");
                    return;
                }
                for (section, count) in sections {
                    println!(
                        "{} | {:>2}. {} ({})",
                        short_id(&section.id),
                        section.rank + 1,
                        truncate(&section.title, 40),
                        count
                    );
                }
                println!("\n{} section(s)", sections.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = sections
                    .iter()
                    .map(|(section, count)| {
                        serde_json::json!({
                            "id": section.id,
                            "title": section.title,
                            "rank": section.rank,
                            "background_color": section.background_color,
                            "text_color": section.text_color,
                            "favorites": count,
                        })
                    })
                    .collect();
                print_json(&json);
            }
            OutputFormat::Quiet => {
                for (section, _) in sections {
                    println!("{}", section.id);
                }
            }
        }
    }

    /// Print a single favorite
    pub fn print_favorite(&self, favorite: &Favorite, section: Option<&Section>) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", favorite.id);
                println!("Title:      {}", favorite.title);
                println!("URL:        {}", favorite.url);
                if let Some(section) = section {
                    println!("Section:    {}", section.title);
                }
                println!("Position:   {}", favorite.rank + 1);
                if let Some(ref icon) = favorite.icon {
                    println!("Icon:       {}", icon);
                }
                println!("Created:    {}", favorite.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:    {}", favorite.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(favorite),
            OutputFormat::Quiet => println!("{}", favorite.id),
        }
    }

    /// Print sections with their favorites, in display order
    pub fn print_view(&self, views: &[SectionView]) {
        match self.format {
            OutputFormat::Human => {
                if views.is_empty() {
                    println!("No favorites found.");
                    return;
                }
                let mut total = 0;
                for view in views {
                    println!("── {} ({}) ──", view.section.title, short_id(&view.section.id));
                    if view.favorites.is_empty() {
                        println!("  (empty)");
                    }
                    for favorite in &view.favorites {
                        println!(
                            "  {} | {} | {}",
                            short_id(&favorite.id),
                            pad(&truncate(&favorite.title, 30), 30),
                            truncate(&favorite.url, 50)
                        );
                    }
                    total += view.favorites.len();
                    println!();
                }
                println!("{} favorite(s)", total);
            }
            OutputFormat::Json => print_json(&views),
            OutputFormat::Quiet => {
                for favorite in views.iter().flat_map(|v| &v.favorites) {
                    println!("{}", favorite.id);
                }
            }
        }
    }

    /// Print the counts of an import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Imported:         {}", report.imported);
                println!("Skipped:          {}", report.skipped);
                println!("Failed:           {}", report.failed);
                println!("Sections created: {}", report.sections_created);
                for error in &report.errors {
                    println!("  {}", error);
                }
            }
            OutputFormat::Json => {
                let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
                print_json(&serde_json::json!({
                    "imported": report.imported,
                    "skipped": report.skipped,
                    "failed": report.failed,
                    "sections_created": report.sections_created,
                    "errors": errors,
                }));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print board notifications to stderr
    ///
    /// Quiet mode only shows errors.
    pub fn print_notifications(&self, notifications: &[Notification]) {
        for notification in notifications {
            match self.format {
                OutputFormat::Human => {
                    eprintln!("{} {}", marker(notification.kind), notification.message);
                }
                OutputFormat::Json => {
                    eprintln!(
                        "{}",
                        serde_json::json!({
                            "status": notification.kind,
                            "message": notification.message
                        })
                    );
                }
                OutputFormat::Quiet => {
                    if notification.kind == NotificationKind::Error {
                        eprintln!("{}", notification.message);
                    }
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn marker(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Success => "✓",
        NotificationKind::Error => "✗",
        NotificationKind::Warning => "!",
        NotificationKind::Info => "·",
    }
}

/// First eight characters of an id, enough to pass back as a prefix
fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Right-pad to a width in characters
fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_should_prompt() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Human)
            .with_assume_yes(true)
            .should_prompt());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ação rápida demais", 8), "ação ...");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }

    #[test]
    fn test_short_id() {
        let id = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(short_id(&id), "67e55044");
    }
}

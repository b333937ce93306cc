use colored::Colorize;

/// Sink for per-item warnings. Every warning is kept so callers can
/// inspect what was skipped; `echo` additionally prints them as they come.
#[derive(Debug, Default)]
pub struct Diagnostics {
    echo: bool,
    warnings: Vec<String>,
}

impl Diagnostics {
    /// Records warnings without printing them.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Records warnings and prints each one in yellow.
    pub fn echo() -> Self {
        Self { echo: true, warnings: Vec::new() }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.echo {
            println!("{}", format!("warn: {}", msg).yellow());
        }
        self.warnings.push(msg);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.warnings.iter().any(|w| w.contains(needle))
    }
}

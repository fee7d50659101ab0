//! Progress display module
//!
//! Styled console output, progress bars and the final run report.

use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                                                                              ║
║   ██████╗  ██████╗ ██╗     ██╗ ██████╗██╗   ██╗                              ║
║   ██╔══██╗██╔═══██╗██║     ██║██╔════╝╚██╗ ██╔╝                              ║
║   ██████╔╝██║   ██║██║     ██║██║      ╚████╔╝                               ║
║   ██╔═══╝ ██║   ██║██║     ██║██║       ╚██╔╝                                ║
║   ██║     ╚██████╔╝███████╗██║╚██████╗   ██║                                 ║
║   ╚═╝      ╚═════╝ ╚══════╝╚═╝ ╚═════╝   ╚═╝                                 ║
║                                                                              ║
║                  Password Dictionary Policy Filter                           ║
║                         For Penetration Testing                              ║
║                                                              v1.0.0          ║
╚══════════════════════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.green());
}

/// Print a section header
pub fn print_header(text: &str) {
    println!("\n{} {}", "▶".green(), text.green().bold());
}

/// Print an info message
pub fn print_info(text: &str) {
    println!("  {} {}", "ℹ".cyan(), text);
}

/// Print a success message
pub fn print_success(text: &str) {
    println!("  {} {}", "✔".green(), text.green());
}

/// Print a warning message
pub fn print_warning(text: &str) {
    println!("  {} {}", "⚠".yellow(), text.yellow());
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Print a bullet point
pub fn print_bullet(text: &str) {
    println!("  {} {}", "•".green(), text);
}

/// Create a styled progress bar counting lines
pub fn create_progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {human_pos}/{human_len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Create a bytes-based progress bar
pub fn create_bytes_progress_bar(total_bytes: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Counts produced by one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatistics {
    pub total_lines: u64,
    pub valid_lines: u64,
    /// Size of the accepted lines appended to the output
    pub bytes_written: u64,
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Share of lines kept, in percent. Zero for an empty input.
    pub fn retention_percent(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.valid_lines as f64 * 100.0 / self.total_lines as f64
        }
    }

    pub fn lines_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.total_lines as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print final statistics
    pub fn print_summary(&self, output: &Path) {
        println!();
        println!("{}", "═".repeat(60).green());
        println!("{}", "                    PROCESSING COMPLETE".green().bold());
        println!("{}", "═".repeat(60).green());
        println!();

        println!("  {} {}", "Passwords processed:".green(), format_number(self.total_lines));
        println!(
            "  {} {} ({:.2}%)",
            "Passwords retained: ".green().bold(),
            format_number(self.valid_lines).green().bold(),
            self.retention_percent()
        );
        println!();
        println!("  {} {}", "Duration:           ".green(), format_duration(self.elapsed));
        println!("  {} {:.2} lines/sec", "Throughput:         ".green(), self.lines_per_second());
        println!("  {} {:?}", "Output file:        ".green(), output);
        println!("  {} {}", "Output size:        ".green(), ByteSize(self.bytes_written));
        println!();
        println!("{}", "═".repeat(60).green());
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

//! Styled terminal output for bacpacman
//!
//! Everything the user reads goes through these helpers (via the `Output`
//! trait), diagnostics go through the `log` facade instead. Errors go to
//! stderr so a failed run can still be piped.

use owo_colors::OwoColorize;

type Rgb = (u8, u8, u8);

const MINT: Rgb = (152, 225, 152);
const CORAL: Rgb = (255, 160, 160);
const CREAM: Rgb = (255, 230, 160);
const SKY: Rgb = (160, 200, 255);
const LAVENDER: Rgb = (181, 174, 254);
const GREY: Rgb = (160, 160, 160);

fn marked(symbol: &str, colour: Rgb, message: &str) -> String {
    let (r, g, b) = colour;
    format!(
        "{} {}",
        symbol.truecolor(r, g, b).bold(),
        message.bright_white()
    )
}

fn muted(text: &str) -> String {
    let (r, g, b) = GREY;
    text.truecolor(r, g, b).to_string()
}

pub fn success(message: &str) {
    println!("{}", marked("✓", MINT, message));
}

pub fn error(message: &str) {
    eprintln!("{}", marked("✗", CORAL, message));
}

pub fn warning(message: &str) {
    println!("{}", marked("⚠", CREAM, message));
}

pub fn info(message: &str) {
    println!("{}", marked("ℹ", SKY, message));
}

/// Section header followed by a rule
pub fn section(title: &str) {
    let (r, g, b) = LAVENDER;
    println!("\n{}", title.truecolor(r, g, b).bold());
    println!("{}", muted(&"─".repeat(50)));
}

/// One summary row; keys are padded so a block of rows lines up
pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", muted(&format!("{:<16}", format!("{}:", key))), value.bright_white());
}

pub fn dimmed(message: &str) {
    println!("{}", muted(message));
}

pub fn list_item(text: &str) {
    println!("  {} {}", "•".bright_white(), text.bright_white());
}

pub fn blank() {
    println!();
}

/// A command line the user can copy and run
pub fn command_suggestion(description: &str, command: &str) {
    let (r, g, b) = CREAM;
    println!(
        "  {} {}",
        muted(description),
        command.truecolor(r, g, b).bold()
    );
}

/// Prerequisite line: tool name and whether it was found
pub fn status_check(item: &str, available: bool) {
    let (symbol, colour, state) = if available {
        ("✓", MINT, "available")
    } else {
        ("✗", CORAL, "not found")
    };
    println!("  {} {}", marked(symbol, colour, item), muted(state));
}

/// Text captured from sqlpackage, echoed behind a gutter
pub fn tool_output(text: &str) {
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        println!("  {} {}", muted("│"), line);
    }
}

use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

/// Titled block of aligned `command  description` rows for help output.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, description: &str) -> Self {
        self.rows.push((name.to_string(), description.to_string()));
        self
    }

    pub fn text(mut self, line: &str) -> Self {
        self.rows.push((String::new(), line.to_string()));
        self
    }

    pub fn print(&self) {
        println!("\n {}", style(&self.title).bold().underlined());
        let width = self.rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, description) in &self.rows {
            if name.is_empty() {
                println!("   {}", style(description).dim());
            } else {
                let padded = format!("{:<width$}", name, width = width);
                println!("   {}  {}", style(padded).green(), description);
            }
        }
    }
}

pub fn print_banner() {
    let lines: &[&str] = &[
        " _ _                _                         _ _           ",
        "| | |_ __ ___      | | _____  ___ _ __   __ _| (_)_   _____ ",
        "| | | '_ ` _ \\_____| |/ / _ \\/ _ \\ '_ \\ / _` | | \\ \\ / / _ \\",
        "| | | | | | | |____|   <  __/  __/ |_) | (_| | | |\\ V /  __/",
        "|_|_|_| |_| |_|    |_|\\_\\___|\\___| .__/ \\__,_|_|_| \\_/ \\___|",
        "                                 |_|                        ",
    ];

    // Gradient: #34d399 -> #22d3ee -> #818cf8 (diagonal top-left to bottom-right)
    let stops: [(u8, u8, u8); 3] = [(52, 211, 153), (34, 211, 238), (129, 140, 248)];
    let max_w = 61u32;
    let max_d = max_w + 5 * 10;

    println!();
    for (y, line) in lines.iter().enumerate() {
        for (x, ch) in line.chars().enumerate() {
            if ch == ' ' {
                print!(" ");
                continue;
            }
            let d = ((x as u32 + y as u32 * 10) * 1000 / max_d).min(1000);
            let (r, g, b) = if d <= 500 {
                lerp_color(stops[0], stops[1], d * 2)
            } else {
                lerp_color(stops[1], stops[2], (d - 500) * 2)
            };
            print!("\x1b[38;2;{};{};{}m{}", r, g, b, ch);
        }
        println!();
    }
    print!("\x1b[0m");
    println!("\x1b[38;2;34;211;238mKeeps your LLM API keys warm.\x1b[0m\n");
}

fn lerp_color(a: (u8, u8, u8), b: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| ((x as u32 * (1000 - t) + y as u32 * t) / 1000) as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub fn print_goodbye() {
    println!("\n{} {}", SPARKLE, style("Keepalive stopped.").bold().cyan());
}

#[cfg(test)]
mod tests {
    use super::lerp_color;

    #[test]
    fn lerp_hits_both_endpoints() {
        assert_eq!(lerp_color((0, 100, 200), (200, 100, 0), 0), (0, 100, 200));
        assert_eq!(lerp_color((0, 100, 200), (200, 100, 0), 1000), (200, 100, 0));
        assert_eq!(lerp_color((0, 100, 200), (200, 100, 0), 500), (100, 100, 100));
    }
}

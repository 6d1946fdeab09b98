//! ASCII banner with a horizontal-line gradient (KB-CHAT).

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Deep Ocean (#1565c0).
const OCEAN_BLUE: (u8, u8, u8) = (0x15, 0x65, 0xc0);
/// Aqua (#26c6da).
const AQUA: (u8, u8, u8) = (0x26, 0xc6, 0xda);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints "KB-CHAT" in the standard figlet font with a blue-to-aqua gradient, then the version.
pub fn print_welcome() {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("KB-CHAT").map(|f| f.to_string()))
        .unwrap_or_else(|| "KB-CHAT\n".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(OCEAN_BLUE, AQUA, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: AQUA.0,
        g: AQUA.1,
        b: AQUA.2,
    }));
    let _ = out.execute(Print(format!("v{}  type /help for commands\r\n", version)));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

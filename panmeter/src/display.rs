//! Text presentation of level vectors

use crate::analysis::LevelVector;
use crate::config::DisplayConfig;
use std::fmt::Write;

/// Width of the longest channel label ("Right-Center")
const LABEL_WIDTH: usize = 12;

/// Map `db` into [0, 1] over `min_db..max_db`, clamped.
pub fn normalize(db: f64, min_db: f64, max_db: f64) -> f64 {
    if !db.is_finite() || max_db <= min_db {
        return 0.0;
    }
    ((db - min_db) / (max_db - min_db)).clamp(0.0, 1.0)
}

/// One bar of `width` cells, filled proportionally
pub fn bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat('█').take(filled));
    out.extend(std::iter::repeat('·').take(width - filled));
    out
}

/// Five labelled bars, one line per virtual channel
pub fn render_meter(levels: &LevelVector, config: &DisplayConfig) -> String {
    let mut out = String::new();
    for (channel, db) in levels.channels() {
        let fraction = normalize(db, config.db_min, config.db_max);
        let _ = writeln!(
            out,
            "{:<width$} {} {:>6.1} dB",
            channel.label(),
            bar(fraction, config.bar_width),
            db,
            width = LABEL_WIDTH
        );
    }
    out
}

/// Plain table for whole-stream summaries
pub fn render_summary(levels: &LevelVector) -> String {
    let mut out = String::new();
    for (channel, db) in levels.channels() {
        let _ = writeln!(out, "{:<width$} {:>8.2} dB", channel.label(), db, width = LABEL_WIDTH);
    }
    out
}

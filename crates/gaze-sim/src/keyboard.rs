//! On-screen dwell keyboard

use selection::DwellTarget;

const ROWS: [&str; 3] = ["ABCDEFGHI", "JKLMNOPQR", "STUVWXYZ_"];

/// One rect target per key, filling the viewport
pub fn layout(viewport: (f64, f64)) -> Vec<DwellTarget> {
    let key_w = viewport.0 / 9.0;
    let key_h = viewport.1 / ROWS.len() as f64;
    ROWS.iter()
        .enumerate()
        .flat_map(|(row, keys)| {
            keys.chars().enumerate().map(move |(col, key)| {
                DwellTarget::rect(key.to_string(), col as f64 * key_w, row as f64 * key_h, key_w, key_h)
            })
        })
        .collect()
}

/// Key center in normalized screen coordinates
pub fn key_center(key: char) -> Option<(f64, f64)> {
    ROWS.iter().enumerate().find_map(|(row, keys)| {
        keys.chars()
            .position(|k| k == key)
            .map(|col| ((col as f64 + 0.5) / 9.0, (row as f64 + 0.5) / ROWS.len() as f64))
    })
}

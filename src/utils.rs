use chrono::NaiveTime;

use crate::error::{PhysioError, Result};

/// 检查字符串是否为有效的整数
pub fn is_integer_number(s: &str) -> bool {
    let s = s.trim();
    let digits = s.strip_prefix('+').or_else(|| s.strip_prefix('-')).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// 非本地化的整数解析（不接受空字符串）
pub fn atoi_nonlocalized(s: &str) -> Option<i64> {
    let s = s.trim();
    if !is_integer_number(s) {
        return None;
    }
    s.parse().ok()
}

/// Formats one TSV cell; NaN is written as `nan`
pub fn format_sample(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        value.to_string()
    }
}

/// Parses one TSV cell written by [`format_sample`]
pub fn parse_sample(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| PhysioError::InvalidSample(cell.to_string()))
}

/// Index of the first line containing `needle`
pub fn find_line_with_string<S: AsRef<str>>(lines: &[S], needle: &str) -> Option<usize> {
    lines.iter().position(|line| line.as_ref().contains(needle))
}

/// Integer value following `tag` on the first line that carries it
///
/// Footer lines look like `LogStartMDHTime:  39008572`.
pub fn tag_value(lines: &[String], tag: &str) -> Option<i64> {
    lines.iter().find_map(|line| {
        let rest = line.trim_start().strip_prefix(tag)?;
        let rest = rest.trim_start().strip_prefix(':').unwrap_or(rest);
        rest.split_whitespace().next().and_then(atoi_nonlocalized)
    })
}

/// MDH/MPCU times are milliseconds after midnight
pub fn ms_to_time_of_day(ms: i64) -> Option<NaiveTime> {
    if ms < 0 {
        return None;
    }
    let secs = u32::try_from(ms / 1000).ok()?;
    let nanos = ((ms % 1000) * 1_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

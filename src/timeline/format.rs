//! Duration and axis label formatting.

/// Format a span duration given in microseconds.
///
/// Below a millisecond the value is shown in whole microseconds; below 10ms
/// (after rounding) with one decimal; beyond that in whole milliseconds.
pub fn format_duration(micros: u64) -> String {
    if micros < 1_000 {
        return format!("{micros}µs");
    }
    let tenths = (micros + 50) / 100;
    if tenths < 100 {
        format!("{}.{}ms", tenths / 10, tenths % 10)
    } else {
        format!("{}ms", (micros + 500) / 1_000)
    }
}

/// Format an axis tick at `micros`.
///
/// The unit and precision come from the tick step so every label on one
/// axis reads the same way.
pub fn format_tick(micros: f64, step: f64) -> String {
    if step < 100.0 {
        return format!("{:.0}µs", micros.max(0.0));
    }
    let step_ms = step / 1_000.0;
    let decimals = if step_ms >= 1.0 {
        0
    } else {
        ((-step_ms.log10() - 1e-9).ceil() as usize).min(3)
    };
    format!("{:.*}ms", decimals, micros.max(0.0) / 1_000.0)
}

/// Truncate `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

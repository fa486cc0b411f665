/// Human-readable remaining time.
///
/// Under a minute shows rounded seconds, under an hour shows minutes rounded
/// up, anything longer shows hours and minutes with the minutes rounded up.
pub fn format_eta(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    if seconds < 60.0 {
        return format!("~{}s", seconds.round() as u64);
    }
    if seconds < 3600.0 {
        return format!("~{} min", (seconds / 60.0).ceil() as u64);
    }
    let mut hours = (seconds / 3600.0).floor() as u64;
    let mut minutes = ((seconds - hours as f64 * 3600.0) / 60.0).ceil() as u64;
    if minutes == 60 {
        hours += 1;
        minutes = 0;
    }
    format!("~{}h {}m", hours, minutes)
}

//! Human-readable durations for log lines and operator output.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render `secs` using its two largest units, e.g. `7d 0h`, `2m 5s`, `42s`.
pub fn format_duration(secs: u64) -> String {
    let Some(lead) = UNITS.iter().position(|&(size, _)| secs >= size) else {
        return "0s".to_string();
    };
    let (size, unit) = UNITS[lead];
    let mut out = format!("{}{unit}", secs / size);
    if let Some(&(next_size, next_unit)) = UNITS.get(lead + 1) {
        out.push_str(&format!(" {}{next_unit}", (secs % size) / next_size));
    }
    out
}

/// Render the distance from `now` to `deadline`, both in unix seconds.
pub fn format_until(deadline: u64, now: u64) -> String {
    if deadline >= now {
        format!("in {}", format_duration(deadline - now))
    } else {
        format!("{} ago", format_duration(now - deadline))
    }
}

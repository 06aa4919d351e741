//! Pure text transformations over a crontab body.

/// Prefix of the marker comment placed before each managed line.
pub const MARKER_PREFIX: &str = "# ustcmirror:";

/// Marker comment tagging the entry of repository `name`.
pub fn marker_line(name: &str) -> String {
    format!("{MARKER_PREFIX} {name}")
}

/// Managed schedule line: `<interval> <launcher> sync <name>`.
pub fn managed_line(interval: &str, launcher: &str, name: &str) -> String {
    format!("{} {} sync {}", interval.trim(), launcher, name)
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_marker_for(line: &str, name: &str) -> bool {
    line.trim()
        .strip_prefix(MARKER_PREFIX)
        .is_some_and(|rest| rest.trim() == name)
}

/// Whether `line` is an uncommented `... sync <name>` entry.
///
/// Matches whole tokens, so `sync debian` never matches `sync debian-cd`
/// or `sync xdebian`.
pub fn is_managed_line_for(line: &str, name: &str) -> bool {
    if is_comment(line) {
        return false;
    }
    let mut tokens = line.split_whitespace().rev();
    matches!((tokens.next(), tokens.next()), (Some(last), Some("sync")) if last == name)
}

/// Keeps every comment line and every line for which `remove` is false.
pub fn retain_lines(table: &str, remove: impl Fn(&str) -> bool) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0;
    for line in table.lines() {
        if is_comment(line) || !remove(line) {
            kept.push(line);
        } else {
            removed += 1;
        }
    }
    (join_lines(&kept), removed)
}

/// Drops the entry of `name`: its marker, the `sync <name>` line it tags,
/// and any unmarked `sync <name>` line. Returns the new table and the number of
/// scheduling lines removed (markers not counted).
pub fn remove_entry(table: &str, name: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0;
    let mut lines = table.lines().peekable();
    while let Some(line) = lines.next() {
        if is_marker_for(line, name) {
            // An orphaned marker goes alone; the next line may be unrelated.
            if lines.peek().is_some_and(|next| is_managed_line_for(next, name)) {
                lines.next();
                removed += 1;
            }
            continue;
        }
        if is_managed_line_for(line, name) {
            removed += 1;
            continue;
        }
        kept.push(line);
    }
    (join_lines(&kept), removed)
}

/// Replaces any existing entry of `name` with a marker plus `line`, appended
/// at the end of the table.
pub fn upsert_entry(table: &str, name: &str, line: &str) -> String {
    let (mut body, _) = remove_entry(table, name);
    body.push_str(&marker_line(name));
    body.push('\n');
    body.push_str(line);
    body.push('\n');
    body
}

fn join_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

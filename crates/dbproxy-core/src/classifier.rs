/// Classification of a statement's effect, used to decide whether it is
/// routed to one node (read) or broadcast to every enabled node (write).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Write,
    Ddl,
    Tx,
    Admin,
    Procedure,
    Multi,
    Other,
}

/// Classifies a raw SQL statement by its first keyword, after stripping
/// comments. Pure and reentrant: no I/O, no shared state.
pub fn classify(statement: &str) -> StatementKind {
    let stripped = strip_comments(statement);
    let trimmed = stripped.trim();
    if has_multiple_segments(trimmed) {
        return StatementKind::Multi;
    }
    let lowered = trimmed.to_ascii_lowercase();
    let first_word = lowered.split_whitespace().next().unwrap_or("");
    match first_word {
        "select" => StatementKind::Select,
        "insert" | "update" | "delete" => StatementKind::Write,
        "create" | "alter" | "drop" | "rename" | "truncate" => StatementKind::Ddl,
        "begin" | "commit" | "rollback" => StatementKind::Tx,
        "set" | "use" | "pragma" => StatementKind::Admin,
        "call" | "exec" => StatementKind::Procedure,
        _ => StatementKind::Other,
    }
}

fn strip_comments(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut chars = statement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' && chars.peek() == Some(&'-') {
            for c in chars.by_ref() {
                if c == '\n' {
                    out.push('\n');
                    break;
                }
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = ' ';
            for c in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn has_multiple_segments(stripped: &str) -> bool {
    stripped
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .count()
        > 1
}

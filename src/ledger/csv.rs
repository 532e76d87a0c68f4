use super::action::ChannelAction;
use super::record::{ChannelRecord, LEDGER_HEADERS};
use super::LedgerError;

/// Minimal RFC-4180-style codec for the ledger table. Fields containing a
/// comma, quote, or newline are quoted; quotes are doubled.
pub fn encode_ledger(records: &[ChannelRecord]) -> String {
    let mut out = String::new();
    out.push_str(&LEDGER_HEADERS.join(","));
    out.push('\n');
    for record in records {
        let fields = [
            record.channel_id.as_str(),
            record.name.as_str(),
            record.description.as_str(),
            if record.is_private { "true" } else { "false" },
            if record.is_shared { "true" } else { "false" },
            &record.member_count.to_string(),
            record.created_date.as_str(),
            record.last_activity.as_str(),
            record.action.as_str(),
            record.target_value.as_str(),
            record.notes.as_str(),
        ]
        .map(escape_field);
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub fn decode_ledger(path: &str, text: &str) -> Result<Vec<ChannelRecord>, LedgerError> {
    let rows = parse_rows(text).map_err(|reason| LedgerError::MalformedRow {
        path: path.to_string(),
        line: 0,
        reason,
    })?;
    let mut rows = rows.into_iter().enumerate();
    let headers = match rows.next() {
        Some((_, headers)) => headers,
        None => {
            return Err(LedgerError::MissingHeaders {
                path: path.to_string(),
                missing: LEDGER_HEADERS.join(", "),
            })
        }
    };
    let missing: Vec<&str> = LEDGER_HEADERS
        .iter()
        .filter(|h| !headers.iter().any(|col| col == *h))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::MissingHeaders {
            path: path.to_string(),
            missing: missing.join(", "),
        });
    }

    let column = |name: &str| headers.iter().position(|col| col == name);
    let mut records = Vec::new();
    for (idx, row) in rows {
        let line = idx + 1;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let field = |name: &str| -> String {
            column(name)
                .and_then(|pos| row.get(pos))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let required = |name: &str| -> Result<String, LedgerError> {
            let value = field(name);
            if value.is_empty() {
                return Err(LedgerError::MissingField {
                    path: path.to_string(),
                    line,
                    field: name.to_string(),
                });
            }
            Ok(value)
        };

        let channel_id = required("channel_id")?;
        let name = required("name")?;
        let action_raw = required("action")?;
        let action =
            ChannelAction::parse(&action_raw).ok_or_else(|| LedgerError::UnknownAction {
                channel: name.clone(),
                action: action_raw.clone(),
            })?;

        let record = ChannelRecord {
            channel_id,
            name,
            description: field("description"),
            is_private: parse_bool(&field("is_private")),
            is_shared: parse_bool(&field("is_shared")),
            member_count: field("member_count").parse().unwrap_or(0),
            created_date: field("created_date"),
            last_activity: field("last_activity"),
            action,
            target_value: field("target_value"),
            notes: field("notes"),
        };
        super::validate_record(&record)?;
        records.push(record);
    }
    Ok(records)
}

fn parse_bool(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

fn escape_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn parse_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

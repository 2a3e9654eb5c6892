//! Minimal line-oriented CSV reading and writing.
//!
//! # Invariants
//! - Fields containing `,`, `"` or a line break are quoted on write, with
//!   inner quotes doubled.
//! - One record per line; quoted fields may not span lines.
//! - Reported line numbers are 1-based and count the header.

use crate::error::AppError;

/// Splits one CSV line into fields.
pub fn parse_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut field_was_quoted = false;

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                other => current.push(other),
            }
            continue;
        }
        match ch {
            ',' => {
                fields.push(std::mem::take(&mut current));
                field_was_quoted = false;
            }
            '"' if current.is_empty() && !field_was_quoted => {
                in_quotes = true;
                field_was_quoted = true;
            }
            '"' => return Err("unexpected quote inside an unquoted field".to_string()),
            other if field_was_quoted => {
                return Err(format!("unexpected `{other}` after a closing quote"));
            }
            other => current.push(other),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

/// Joins fields into one CSV line, without the trailing newline.
pub fn write_record<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parsed data rows with their 1-based line numbers.
///
/// The first non-empty line must equal `expected_header` (whitespace around
/// fields ignored). Blank lines are skipped; every row must have exactly
/// as many fields as the header.
pub fn read_rows(
    text: &str,
    expected_header: &[&str],
) -> Result<Vec<(usize, Vec<String>)>, AppError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Err(AppError::Import {
            line: 1,
            message: "missing header".to_string(),
        });
    };
    let header = parse_record(header).map_err(|message| AppError::Import {
        line: header_line,
        message,
    })?;
    let header_matches = header.len() == expected_header.len()
        && header
            .iter()
            .zip(expected_header)
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));
    if !header_matches {
        return Err(AppError::Import {
            line: header_line,
            message: format!("expected header `{}`", expected_header.join(",")),
        });
    }

    let mut rows = Vec::new();
    for (line_number, line) in lines {
        let fields = parse_record(line).map_err(|message| AppError::Import {
            line: line_number,
            message,
        })?;
        if fields.len() != expected_header.len() {
            return Err(AppError::Import {
                line: line_number,
                message: format!(
                    "expected {} fields, found {}",
                    expected_header.len(),
                    fields.len()
                ),
            });
        }
        rows.push((line_number, fields));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{parse_record, read_rows, write_record};
    use crate::error::AppError;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let fields = parse_record(r#"a,"b, c","say ""hi""",,"#).unwrap();
        assert_eq!(fields, vec!["a", "b, c", "say \"hi\"", "", ""]);
    }

    #[test]
    fn malformed_quotes_are_rejected() {
        assert!(parse_record(r#""open,field"#).is_err());
        assert!(parse_record(r#"ab"c,d"#).is_err());
        assert!(parse_record(r#""ab"c,d"#).is_err());
    }

    #[test]
    fn written_record_reads_back() {
        let line = write_record(&["Crème, fraîche", "2", "pot \"bio\""]);
        assert_eq!(line, r#""Crème, fraîche",2,"pot ""bio""""#);
        assert_eq!(
            parse_record(&line).unwrap(),
            vec!["Crème, fraîche", "2", "pot \"bio\""]
        );
    }

    #[test]
    fn rows_report_line_numbers() {
        let text = "a,b\n1,2\n\n3\n";
        let err = read_rows(text, &["a", "b"]).unwrap_err();
        match err {
            AppError::Import { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn header_must_match() {
        assert!(read_rows("x,y\n1,2\n", &["a", "b"]).is_err());
        assert!(read_rows("", &["a"]).is_err());
        let rows = read_rows("A , b\r\n1,2\r\n", &["a", "b"]).unwrap();
        assert_eq!(rows, vec![(2, vec!["1".to_string(), "2".to_string()])]);
    }
}

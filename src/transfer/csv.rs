//! Delimited text to typed table conversion.
//!
//! Lines are split naively on the delimiter and then repaired right-to-left so
//! that quoted fields containing the delimiter come back as one field.

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{TransferError, TransferResult};

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("line break pattern is valid"));

/// A coerced CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Boolean(b) => Value::Bool(b),
            CellValue::Number(n) => number_to_json(n),
            CellValue::String(s) => Value::String(s),
        }
    }
}

// Whole numbers go out as integers so `30` stays `30` on the wire
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvParseConfig {
    pub delimiter: char,
    pub has_header_row: bool,
}

impl Default for CsvParseConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header_row: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvParseResult {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Parse delimited text into headers and coerced rows.
///
/// Line 0 always supplies the headers. Without a header row it is parsed as
/// the first data row as well. Consumption stops at the first empty line.
pub fn parse_csv(text: &str, config: &CsvParseConfig) -> TransferResult<CsvParseResult> {
    let delimiter = config.delimiter;
    let lines: Vec<&str> = LINE_BREAKS.split(text).collect();
    let headers = split_csv_line(lines.first().copied().unwrap_or_default(), delimiter);
    if headers.len() < 2 {
        return Err(TransferError::TooFewColumns);
    }

    let candidates = if config.has_header_row {
        &lines[1..]
    } else {
        &lines[..]
    };

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for line in candidates {
        if line.is_empty() {
            break;
        }
        let fields = split_csv_line(line, delimiter);
        if fields.len() != headers.len() {
            let offset = if config.has_header_row { 2 } else { 1 };
            return Err(TransferError::RowShapeMismatch {
                line: rows.len() + offset,
            });
        }
        rows.push(fields.iter().map(|field| coerce(field)).collect());
    }

    Ok(CsvParseResult { headers, rows })
}

fn ends_with_quote(field: &str) -> bool {
    field.trim_end().ends_with('"')
}

fn is_complete_quoted(field: &str) -> bool {
    let lead = field.trim_start();
    lead.len() > 1 && lead.starts_with('"')
}

fn unquote(field: &str) -> String {
    let inner = field.trim_start();
    let inner = inner.strip_prefix('"').unwrap_or(inner).trim_end();
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    inner.replace("\"\"", "\"")
}

/// Split one line on `delimiter`, honouring double-quoted fields.
///
/// Unquoted fields are returned verbatim, including any `""` they contain.
pub fn split_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields: Vec<String> = line.split(delimiter).map(str::to_string).collect();
    let mut x = fields.len();
    while x > 0 {
        x -= 1;
        if !ends_with_quote(&fields[x]) {
            continue;
        }
        if is_complete_quoted(&fields[x]) {
            fields[x] = unquote(&fields[x]);
        } else if x > 0 {
            let current = fields.remove(x);
            let previous = &mut fields[x - 1];
            previous.push(delimiter);
            previous.push_str(&current);
        } else {
            let first = fields.remove(0);
            let pieces: Vec<String> = first.split(delimiter).map(str::to_string).collect();
            fields.splice(0..0, pieces);
            break;
        }
    }
    fields
}

/// Best-guess typing of a raw cell: number, then boolean, then null for empty,
/// else the untouched string.
///
/// A cell is a number only when it reads back unchanged after the first `,`
/// becomes `.`, so `007`, `+7`, `1e3` and ` 30` stay strings.
pub fn coerce(raw: &str) -> CellValue {
    let normalized = raw.replacen(',', ".", 1);
    if let Ok(number) = normalized.parse::<f64>() {
        if number.is_finite() && format!("{number}") == normalized {
            return CellValue::Number(number);
        }
    }

    let word = raw.trim();
    if word.eq_ignore_ascii_case("true") {
        CellValue::Boolean(true)
    } else if word.eq_ignore_ascii_case("false") {
        CellValue::Boolean(false)
    } else if raw.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rstest::rstest;

    fn with_header(delimiter: char) -> CsvParseConfig {
        CsvParseConfig {
            delimiter,
            has_header_row: true,
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    #[test]
    fn test_end_to_end_example() {
        let result = parse_csv("name,age\nAlice,30\nBob,\n", &with_header(',')).unwrap();
        assert_eq!(result.headers, vec!["name", "age"]);
        assert_eq!(
            result.rows,
            vec![
                vec![text("Alice"), CellValue::Number(30.0)],
                vec![text("Bob"), CellValue::Null],
            ]
        );
    }

    #[rstest]
    #[case(',')]
    #[case(';')]
    #[case('|')]
    #[case('\t')]
    fn test_plain_table_round_trip(#[case] delimiter: char) {
        let lines = [
            vec!["device", "model", "site"],
            vec!["pump-1", "x200", "north"],
            vec!["pump-2", "x300", "south"],
        ];
        let input = lines
            .iter()
            .map(|l| l.join(&delimiter.to_string()))
            .collect::<Vec<_>>()
            .join("\r\n");
        let result = parse_csv(&input, &with_header(delimiter)).unwrap();
        let rejoined: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        assert_eq!(rejoined, lines[1..].to_vec());
    }

    #[rstest]
    #[case(',')]
    #[case(';')]
    #[case('|')]
    #[case('\t')]
    fn test_single_column_is_rejected(#[case] delimiter: char) {
        let result = parse_csv("name\nalpha\nbeta", &with_header(delimiter));
        assert!(matches!(result, Err(TransferError::TooFewColumns)));
    }

    #[test]
    fn test_header_split_with_other_delimiter_is_single_column() {
        let result = parse_csv("name;type\na;b", &with_header(','));
        assert!(matches!(result, Err(TransferError::TooFewColumns)));
    }

    #[test]
    fn test_quoted_delimiter() {
        assert_eq!(split_csv_line(r#"a,"b,c",d"#, ','), vec!["a", "b,c", "d"]);
        assert_eq!(
            split_csv_line(r#""one, two, three",x"#, ','),
            vec!["one, two, three", "x"]
        );
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            split_csv_line(r#""he said ""hi""",2"#, ','),
            vec![r#"he said "hi""#, "2"]
        );
    }

    #[test]
    fn test_whitespace_around_quoted_field() {
        assert_eq!(split_csv_line(r#"a;  "b;c"  ;d"#, ';'), vec!["a", "b;c", "d"]);
    }

    #[test]
    fn test_unquoted_doubled_quotes_are_kept() {
        assert_eq!(
            split_csv_line(r#"say ""x"" now,b"#, ','),
            vec![r#"say ""x"" now"#, "b"]
        );
    }

    #[test]
    fn test_unbalanced_leading_field_is_resplit() {
        assert_eq!(split_csv_line(r#"a",b"#, ','), vec!["a\"", "b"]);
    }

    #[test]
    fn test_row_shape_mismatch_line_numbers() {
        let input = indoc! {"
            name,type
            a,b
            c
        "};
        let err = parse_csv(input, &with_header(',')).unwrap_err();
        assert!(matches!(err, TransferError::RowShapeMismatch { line: 3 }));

        let err = parse_csv("a,b\nc", &CsvParseConfig {
            delimiter: ',',
            has_header_row: false,
        })
        .unwrap_err();
        assert!(matches!(err, TransferError::RowShapeMismatch { line: 2 }));
    }

    #[test]
    fn test_without_header_row_line_zero_is_also_data() {
        let result = parse_csv("d1,thermostat\nd2,meter", &CsvParseConfig {
            delimiter: ',',
            has_header_row: false,
        })
        .unwrap();
        assert_eq!(result.headers, vec!["d1", "thermostat"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0], vec![text("d1"), text("thermostat")]);
    }

    #[test]
    fn test_stops_at_first_empty_line() {
        // Runs of line breaks collapse, so only a trailing break yields an empty line
        let result = parse_csv("a,b\n1,2\n\n\n3,4\n", &with_header(',')).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[rstest]
    #[case("30", CellValue::Number(30.0))]
    #[case("-1.5", CellValue::Number(-1.5))]
    #[case("2,5", CellValue::Number(2.5))]
    #[case("007", text("007"))]
    #[case("+7", text("+7"))]
    #[case("1e3", text("1e3"))]
    #[case("0.50", text("0.50"))]
    #[case(" 30", text(" 30"))]
    #[case("1.0", text("1.0"))]
    #[case("TRUE", CellValue::Boolean(true))]
    #[case(" false ", CellValue::Boolean(false))]
    #[case("", CellValue::Null)]
    #[case("1,234,567", CellValue::String("1,234,567".to_string()))]
    #[case("NaN", CellValue::String("NaN".to_string()))]
    #[case("inf", CellValue::String("inf".to_string()))]
    #[case("12ab", CellValue::String("12ab".to_string()))]
    fn test_coerce(#[case] raw: &str, #[case] expected: CellValue) {
        assert_eq!(coerce(raw), expected);
    }

    #[rstest]
    #[case("42")]
    #[case("0.25")]
    #[case("1,5")]
    #[case("true")]
    #[case("False")]
    fn test_coercion_is_idempotent(#[case] raw: &str) {
        let once = coerce(raw);
        assert_eq!(coerce(&once.to_string()), once);
    }

    #[test]
    fn test_leading_zeros_survive_parsing() {
        let result = parse_csv("name,zip\n007,02134\n", &with_header(',')).unwrap();
        assert_eq!(result.rows[0], vec![text("007"), text("02134")]);
    }

    #[test]
    fn test_cells_convert_to_json() {
        assert_eq!(Value::from(CellValue::Number(30.0)), serde_json::json!(30));
        assert_eq!(Value::from(CellValue::Number(0.5)), serde_json::json!(0.5));
        assert_eq!(Value::from(CellValue::Null), Value::Null);
        assert_eq!(
            serde_json::to_string(&vec![text("x"), CellValue::Boolean(true)]).unwrap(),
            r#"["x",true]"#
        );
    }
}

use super::store::Cell;

/// Parse a spreadsheet cell into a score or weight.
///
/// Accepts comma or dot decimal separators and a trailing percent sign. Blank,
/// unparsable, and non-finite values are treated as missing, never as zero.
pub fn normalize(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(value) => value.is_finite().then_some(*value),
        Cell::Text(raw) => normalize_text(raw),
    }
}

pub fn normalize_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let dotted = trimmed.replace(',', ".");
    let digits = dotted.strip_suffix('%').unwrap_or(&dotted).trim();

    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn again(value: Option<f64>) -> Option<f64> {
        normalize(&Cell::from(value))
    }

    #[test]
    fn comma_and_dot_separators_agree() {
        assert_eq!(normalize_text("2,7"), Some(2.7));
        assert_eq!(normalize_text("2.7"), Some(2.7));
        assert_eq!(normalize(&Cell::text(" 2,7 ")), Some(2.7));
    }

    #[test]
    fn blank_and_null_are_missing() {
        assert_eq!(normalize(&Cell::Empty), None);
        assert_eq!(normalize(&Cell::text("")), None);
        assert_eq!(normalize(&Cell::text("   ")), None);
    }

    #[test]
    fn percent_suffix_is_stripped() {
        assert_eq!(normalize_text("25%"), Some(25.0));
        assert_eq!(normalize_text("12,5 %"), Some(12.5));
    }

    #[test]
    fn garbage_is_missing_not_an_error() {
        assert_eq!(normalize_text("n/a"), None);
        assert_eq!(normalize_text("nan"), None);
        assert_eq!(normalize_text("inf"), None);
        assert_eq!(normalize(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for cell in [
            Cell::text("2,7"),
            Cell::text("3"),
            Cell::text("40%"),
            Cell::text(""),
            Cell::text("abc"),
            Cell::Number(1.25),
            Cell::Empty,
        ] {
            let once = normalize(&cell);
            assert_eq!(again(once), once, "cell {cell:?}");
        }
    }
}

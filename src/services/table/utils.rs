use once_cell::sync::Lazy;
use std::collections::HashSet;

// Default NA vocabulary of common CSV readers.
static MISSING_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
        "<NA>",
    ]
    .into_iter()
    .collect()
});

pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(value.trim())
}

pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| !number.is_nan())
}

/// Resolves the column name for header cell `index`.
///
/// Blank cells get a positional placeholder. A name already in `seen` gets
/// the first free `.N` suffix, so `a, a, a` becomes `a, a.1, a.2`.
pub fn header_name(raw: &str, index: usize, seen: &mut HashSet<String>) -> String {
    let trimmed = raw.trim();
    let base = if trimmed.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        trimmed.to_string()
    };

    let mut name = base.clone();
    let mut counter = 1;
    while !seen.insert(name.clone()) {
        name = format!("{}.{}", base, counter);
        counter += 1;
    }
    name
}

pub fn clean_dataset_name(name: &str) -> String {
    let cleaned = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    if cleaned.chars().next().map_or(true, |c| !c.is_alphabetic()) {
        format!("ds_{}", cleaned)
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_are_trimmed() {
        assert!(is_missing("  "));
        assert!(is_missing(" NA "));
        assert!(is_missing("#N/A"));
        assert!(!is_missing("0"));
        assert!(!is_missing("none"));
    }

    #[test]
    fn numbers_parse_but_nan_does_not() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("NAN"), None);
        assert_eq!(parse_number("12abc"), None);
    }

    #[test]
    fn blank_headers_get_placeholders() {
        let mut seen = HashSet::new();
        assert_eq!(header_name("  ", 3, &mut seen), "Unnamed: 3");
        assert_eq!(header_name(" age ", 0, &mut seen), "age");
    }

    #[test]
    fn repeated_headers_get_numeric_suffixes() {
        let mut seen = HashSet::new();
        let names: Vec<String> = ["a", "a", "b", "a", "a.1"]
            .iter()
            .enumerate()
            .map(|(idx, raw)| header_name(raw, idx, &mut seen))
            .collect();
        assert_eq!(names, vec!["a", "a.1", "b", "a.2", "a.1.1"]);
    }

    #[test]
    fn dataset_names_are_sanitized() {
        assert_eq!(clean_dataset_name("Sales 2024.csv"), "sales_2024_csv");
        assert_eq!(clean_dataset_name("2024.csv"), "ds_2024_csv");
    }
}

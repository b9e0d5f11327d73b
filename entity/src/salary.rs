use serde::Serialize;

/// Outcome of reading a currency-formatted salary cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Salary {
    Amount(i64),
    Unparseable,
}

impl Salary {
    pub fn amount(self) -> Option<i64> {
        match self {
            Salary::Amount(value) => Some(value),
            Salary::Unparseable => None,
        }
    }

    /// Value shown in raw listings, where unparseable cells display as zero.
    pub fn or_zero(self) -> i64 {
        self.amount().unwrap_or(0)
    }
}

/// Parse a salary such as `"$120,000"`.
///
/// Currency symbols and thousands separators are stripped, then the leading
/// integer is read: optional whitespace, an optional sign and at least one
/// digit. Anything after the digits is ignored, so `"$1,250.75"` reads as
/// `1250`.
pub fn parse_salary(raw: &str) -> Salary {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let trimmed = cleaned.trim_start();
    let (negative, rest) = match trimmed.chars().next() {
        Some('-') => (true, &trimmed[1..]),
        Some('+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return Salary::Unparseable;
    }
    match rest[..end].parse::<i64>() {
        Ok(value) if negative => Salary::Amount(-value),
        Ok(value) => Salary::Amount(value),
        Err(_) => Salary::Unparseable,
    }
}

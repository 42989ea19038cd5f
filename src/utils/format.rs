//! Display helpers for the European number format used in reports.

pub const EURO: &str = "€ ";

/// Formats an amount as `€ 1.234,56`: "." for thousands, "," for decimals.
pub fn eur(value: f64) -> String {
    format!("{}{}", EURO, group_decimal(value, 2))
}

/// One decimal and a trailing `%`, e.g. `12.3%`.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn group_decimal(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value);
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{},{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eur_formatting() {
        assert_eq!(eur(0.0), "€ 0,00");
        assert_eq!(eur(12.5), "€ 12,50");
        assert_eq!(eur(1234.56), "€ 1.234,56");
        assert_eq!(eur(1234567.891), "€ 1.234.567,89");
        assert_eq!(eur(999.999), "€ 1.000,00");
    }

    #[test]
    fn test_eur_negative() {
        assert_eq!(eur(-1234.5), "€ -1.234,50");
        assert_eq!(eur(-12.0), "€ -12,00");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(12.345), "12.3%");
        assert_eq!(percent(0.0), "0.0%");
    }
}

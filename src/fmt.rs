/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Share of `part` in `whole` as a percentage string, "—" when `whole` is zero.
pub fn share(part: f64, whole: f64) -> String {
    if whole == 0.0 {
        return "\u{2014}".to_string();
    }
    format!("{:.1}%", part / whole * 100.0)
}

pub fn months(n: i64) -> String {
    match n.abs() {
        1 => format!("{n} month"),
        _ => format!("{n} months"),
    }
}

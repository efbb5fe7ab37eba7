//! Display formatting for money and dates

use chrono::{Datelike, NaiveDateTime, Weekday};

/// Group the integer part of a non-negative number with `sep` every three digits.
fn group_thousands(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

/// Record amount as shown in lists: `R. 12,345.00`
pub fn format_rupiah(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };

    format!("R. {}{}.{}", sign, group_thousands(int_part, ','), frac)
}

/// Whole-rupiah total in Indonesian style: `Rp 12.345.000`
pub fn format_idr(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let sign = if rounded < 0.0 { "-" } else { "" };

    format!("{}Rp {}", sign, group_thousands(&digits, '.'))
}

/// Indonesian weekday name
pub fn hari(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

/// `Sabtu, 30-08-2025`, or `-` when unknown
pub fn format_date_indo(date: Option<NaiveDateTime>) -> String {
    match date {
        Some(d) => format!("{}, {}", hari(d.weekday()), d.format("%d-%m-%Y")),
        None => "-".to_string(),
    }
}

/// `2025-08` as `Agu 2025`; other input is returned unchanged.
pub fn format_month(month: &str) -> String {
    const BULAN: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
    ];

    let parsed = month
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<usize>().ok()?)));

    match parsed {
        Some((year, m)) if (1..=12).contains(&m) => format!("{} {}", BULAN[m - 1], year),
        _ => month.to_string(),
    }
}

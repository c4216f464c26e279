//! Field extraction from the text of Nalo transactional PDFs
//!
//! Only "Versement complémentaire" statements become bills. Their date comes
//! from the `Paris, le <date>` signature line and their amount from the
//! `Montant brut versé:` block, which the PDF renders one word per line.

use super::model::ExtractedFields;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

const TRANSFER_MARKER: &str = "Versement complémentaire";

fn date_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Paris,\s+le\s+(.*)$").expect("date line regex"))
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s+Montant\n\s+brut\n\s+versé:\n\s+(.*)\n\s+Euros").expect("amount regex")
    })
}

fn french_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2})(?:er)?\s+(\p{L}+)\.?\s+(\d{4})").expect("french date regex")
    })
}

/// Inspects the text of one document and extracts its bill fields.
pub fn extract(text: &str) -> ExtractedFields {
    let lines: Vec<&str> = text.split('\n').collect();

    if !lines.iter().any(|line| line.trim() == TRANSFER_MARKER) {
        debug!("Not a transfer invoice");
        return ExtractedFields::ignored();
    }

    ExtractedFields {
        ignore: false,
        date: extract_date(&lines),
        amount: extract_amount(text),
    }
}

fn extract_date(lines: &[&str]) -> Option<NaiveDate> {
    let dates: Vec<&str> = lines
        .iter()
        .filter_map(|line| {
            date_line_re()
                .captures(line.trim_end_matches('\r'))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
        })
        .collect();

    if dates.len() != 1 {
        warn!(count = dates.len(), "No date or too many dates found");
        return None;
    }

    let date = parse_french_date(dates[0]);
    if date.is_none() {
        warn!(raw = dates[0], "Unable to parse document date");
    }
    date
}

fn extract_amount(text: &str) -> Option<f64> {
    let Some(raw) = amount_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        warn!("No transfer amount found");
        return None;
    };

    let amount = normalize_price(raw);
    if amount.is_none() {
        warn!(raw, "Unable to parse transfer amount");
    }
    amount
}

/// Parses a French price such as `1 234,56` into `1234.56`.
pub fn normalize_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replacen(',', ".", 1)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses dates written like `14 mars 2023` or `1er avril 2023`.
///
/// Month names are matched case-insensitively, with or without accents, and
/// in their abbreviated forms. Anything after the year is ignored.
pub fn parse_french_date(raw: &str) -> Option<NaiveDate> {
    let caps = french_date_re().captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = french_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn french_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "janvier" | "janv" => 1,
        "février" | "fevrier" | "févr" | "fevr" | "fév" | "fev" => 2,
        "mars" => 3,
        "avril" | "avr" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" | "juil" => 7,
        "août" | "aout" => 8,
        "septembre" | "sept" => 9,
        "octobre" | "oct" => 10,
        "novembre" | "nov" => 11,
        "décembre" | "decembre" | "déc" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_text(date_lines: &[&str], amount: &str) -> String {
        let mut text = String::from("NALO\nVersement complémentaire\n");
        for line in date_lines {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str(&format!(
            "Détail de l'opération\n   Montant\n   brut\n   versé:\n   {amount}\n   Euros\nFrais: 0\n"
        ));
        text
    }

    #[test]
    fn test_non_transfer_document_is_ignored() {
        let text = "Avenant au contrat\nParis, le 14 mars 2023\n  Montant\n  brut\n  versé:\n  100,00\n  Euros\n";
        let fields = extract(text);
        assert!(fields.ignore);
        assert!(fields.date.is_none());
        assert!(fields.amount.is_none());
    }

    #[test]
    fn test_marker_must_fill_the_whole_line() {
        let text = "Votre Versement complémentaire a été reçu\nVersement complémentaire programmé\n";
        assert!(extract(text).ignore);

        let text = "versement complémentaire\n";
        assert!(extract(text).ignore);
    }

    #[test]
    fn test_marker_tolerates_surrounding_whitespace() {
        let text = "  Versement complémentaire \r\n";
        assert!(!extract(text).ignore);
    }

    #[test]
    fn test_extracts_date_and_amount() {
        let text = transfer_text(&["Paris, le 14 mars 2023"], "1 234,56");
        let fields = extract(&text);

        assert!(!fields.ignore);
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2023, 3, 14));
        assert_eq!(fields.amount, Some(1234.56));
    }

    #[test]
    fn test_missing_date_is_tolerated() {
        let text = transfer_text(&[], "12,50");
        let fields = extract(&text);

        assert!(!fields.ignore);
        assert!(fields.date.is_none());
        assert_eq!(fields.amount, Some(12.5));
    }

    #[test]
    fn test_several_dates_leave_date_unset() {
        let text = transfer_text(&["Paris, le 14 mars 2023", "Paris, le 15 mars 2023"], "10,00");
        let fields = extract(&text);

        assert!(!fields.ignore);
        assert!(fields.date.is_none());
        assert_eq!(fields.amount, Some(10.0));
    }

    #[test]
    fn test_date_prefix_is_anchored() {
        let text = transfer_text(&["Fait à Paris, le 14 mars 2023"], "10,00");
        assert!(extract(&text).date.is_none());
    }

    #[test]
    fn test_missing_amount_is_tolerated() {
        let text = "Versement complémentaire\nParis, le 2 janvier 2024\nMontant brut versé: 100 Euros\n";
        let fields = extract(text);

        assert!(!fields.ignore);
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert!(fields.amount.is_none());
    }

    #[test]
    fn test_malformed_amount_is_tolerated() {
        let text = transfer_text(&["Paris, le 2 janvier 2024"], "N/A");
        let fields = extract(&text);
        assert!(!fields.ignore);
        assert!(fields.amount.is_none());
    }

    #[test]
    fn test_normalize_price() {
        assert_eq!(normalize_price("12,50"), Some(12.5));
        assert_eq!(normalize_price("1 000,00"), Some(1000.0));
        assert_eq!(normalize_price("1\u{a0}234,56"), Some(1234.56));
        assert_eq!(normalize_price("1\u{202f}234,56"), Some(1234.56));
        assert_eq!(normalize_price("250"), Some(250.0));
        assert_eq!(normalize_price("abc"), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn test_parse_french_date() {
        assert_eq!(
            parse_french_date("14 mars 2023"),
            NaiveDate::from_ymd_opt(2023, 3, 14)
        );
        assert_eq!(
            parse_french_date("1er août 2022"),
            NaiveDate::from_ymd_opt(2022, 8, 1)
        );
        assert_eq!(
            parse_french_date("03 Décembre 2021"),
            NaiveDate::from_ymd_opt(2021, 12, 3)
        );
        assert_eq!(
            parse_french_date("9 févr. 2020"),
            NaiveDate::from_ymd_opt(2020, 2, 9)
        );
        assert_eq!(
            parse_french_date("9 fevrier 2020 à 10h"),
            NaiveDate::from_ymd_opt(2020, 2, 9)
        );
        assert_eq!(parse_french_date("31 février 2020"), None);
        assert_eq!(parse_french_date("14 march 2023"), None);
        assert_eq!(parse_french_date("le 14 mars"), None);
    }
}

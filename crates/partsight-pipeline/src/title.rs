//! Title composition

use partsight_domain::{DecodedSpec, QuantityEstimate, SpecField, SpecSheet};

const FALLBACK_TITLE: &str = "Unidentified component";

/// Capacity in whole gigabytes from strings like `4GB` or `16 GB`
pub(crate) fn capacity_gb(capacity: &str) -> Option<u64> {
    let upper = capacity.trim().to_ascii_uppercase();
    let digits = upper.strip_suffix("GB")?.trim();
    digits.parse().ok()
}

/// Megahertz figure from a data rate like `DDR3-1600`
fn mhz(data_rate: &str) -> Option<&str> {
    let (_, rate) = data_rate.rsplit_once('-')?;
    (!rate.is_empty() && rate.chars().all(|c| c.is_ascii_digit())).then_some(rate)
}

/// Build the title for a result
///
/// With a decoded part number the title is composed from decoded fields
/// only. Otherwise the model's suggestion is cleaned and used, and as a last
/// resort a title is assembled from whatever fields exist.
pub fn compose_title(
    decoded: Option<&DecodedSpec>,
    spec: &SpecSheet,
    suggested: Option<&str>,
    quantity: QuantityEstimate,
    max_chars: usize,
) -> String {
    let title = match decoded {
        Some(decoded) => decoded_title(decoded, quantity),
        None => suggested
            .map(clean_suggestion)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| field_title(spec, quantity)),
    };
    truncate(&title, max_chars)
}

fn decoded_title(decoded: &DecodedSpec, quantity: QuantityEstimate) -> String {
    let mut parts: Vec<String> = Vec::new();
    if quantity.is_multiple() {
        parts.push(format!("{}x", quantity.value()));
    }
    if let Some(m) = decoded.field(SpecField::Manufacturer) {
        parts.push(m.to_string());
    }
    parts.push(decoded.part_number.clone());
    for field in [SpecField::Generation, SpecField::Capacity] {
        if let Some(v) = decoded.field(field) {
            parts.push(v.to_string());
        }
    }
    if let Some(rate) = decoded.field(SpecField::DataRate).and_then(mhz) {
        parts.push(format!("{}MHz", rate));
    }
    for field in [SpecField::FormFactor, SpecField::Speed] {
        if let Some(v) = decoded.field(field) {
            parts.push(v.to_string());
        }
    }
    if quantity.is_multiple() {
        if let Some(gb) = decoded.field(SpecField::Capacity).and_then(capacity_gb) {
            parts.push(format!("({}GB total)", gb * u64::from(quantity.value())));
        }
    }
    parts.join(" ")
}

fn field_title(spec: &SpecSheet, quantity: QuantityEstimate) -> String {
    let parts: Vec<&str> = [
        SpecField::Manufacturer,
        SpecField::Model,
        SpecField::Capacity,
        SpecField::Generation,
        SpecField::FormFactor,
        SpecField::Speed,
    ]
    .iter()
    .filter_map(|f| spec.field(*f))
    .collect();

    if parts.is_empty() {
        return spec
            .field(SpecField::Category)
            .map(|c| format!("{} component", c))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());
    }

    let body = parts.join(" ");
    if quantity.is_multiple() {
        format!("{}x {}", quantity.value(), body)
    } else {
        body
    }
}

/// Strip label prefixes, quotes and stray whitespace models add to titles
fn clean_suggestion(raw: &str) -> String {
    let mut text = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if text.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("title:")) {
        text = &text[6..];
    }
    let text = text.trim().trim_matches(|c| matches!(c, '"' | '\'' | '*' | '`'));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let cut: String = title.chars().take(max_chars).collect();
    cut.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use partsight_domain::QuantitySource;

    fn hynix() -> DecodedSpec {
        DecodedSpec::new(
            "SK hynix",
            "HMT451U6AFR8A-PB",
            [
                ("manufacturer", "SK hynix"),
                ("capacity", "4GB"),
                ("generation", "DDR3"),
                ("speed", "PC3-12800"),
                ("data_rate", "DDR3-1600"),
                ("form_factor", "SODIMM"),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_decoded_title() {
        let title = compose_title(Some(&hynix()), &SpecSheet::new(), Some("ignored"), QuantityEstimate::single(), 80);
        assert_eq!(title, "SK hynix HMT451U6AFR8A-PB DDR3 4GB 1600MHz SODIMM PC3-12800");
    }

    #[test]
    fn test_decoded_title_with_quantity() {
        let quantity = QuantityEstimate::new(2, QuantitySource::PartNumberRepetition);
        let title = compose_title(Some(&hynix()), &SpecSheet::new(), None, quantity, 100);
        assert!(title.starts_with("2x SK hynix"));
        assert!(title.ends_with("(8GB total)"));
    }

    #[test]
    fn test_title_truncated_on_char_boundary() {
        let title = compose_title(None, &SpecSheet::new(), Some("Größe ÄÖÜ Speicher Modul"), QuantityEstimate::single(), 9);
        assert_eq!(title, "Größe ÄÖÜ");

        let title = compose_title(None, &SpecSheet::new(), Some("Größe ÄÖÜ"), QuantityEstimate::single(), 6);
        assert_eq!(title, "Größe");
    }

    #[test]
    fn test_suggestion_is_cleaned() {
        let title = compose_title(
            None,
            &SpecSheet::new(),
            Some("\nTitle:  \"Kingston  ValueRAM 4GB\"\nmore text"),
            QuantityEstimate::single(),
            80,
        );
        assert_eq!(title, "Kingston ValueRAM 4GB");
    }

    #[test]
    fn test_composed_from_fields() {
        let spec: SpecSheet = [("manufacturer", "Seagate"), ("model", "ST1000DM003"), ("capacity", "1TB")]
            .into_iter()
            .collect();
        let quantity = QuantityEstimate::new(3, QuantitySource::VisualCount);
        let title = compose_title(None, &spec, Some("   "), quantity, 80);
        assert_eq!(title, "3x Seagate ST1000DM003 1TB");
    }

    #[test]
    fn test_last_resort_titles() {
        let spec: SpecSheet = [("category", "SSD")].into_iter().collect();
        assert_eq!(compose_title(None, &spec, None, QuantityEstimate::single(), 80), "SSD component");
        assert_eq!(
            compose_title(None, &SpecSheet::new(), None, QuantityEstimate::single(), 80),
            FALLBACK_TITLE
        );
    }

    #[test]
    fn test_capacity_gb() {
        assert_eq!(capacity_gb("4GB"), Some(4));
        assert_eq!(capacity_gb(" 16 gb "), Some(16));
        assert_eq!(capacity_gb("512MB"), None);
    }
}

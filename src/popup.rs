//! Hover labels and click popups built from resolved views

use serde::Serialize;

use crate::resolver::ResolvedAttributeView;
use crate::store::{AddressRecord, NOT_AVAILABLE};

/// One labelled popup line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupLine {
    pub label: String,
    pub value: String,
}

/// Structured popup block; the front-end renders it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<PopupLine>,
}

/// Hover label: the account identifier
pub fn hover_label(view: &ResolvedAttributeView) -> String {
    view.account_id.clone().unwrap_or_else(|| "No account".to_string())
}

/// Format a value as whole dollars with thousands separators
pub fn format_dollars(value: f64) -> String {
    let whole = value.round().abs() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && whole > 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}

/// Build the click popup for a parcel
pub fn build(view: &ResolvedAttributeView, address: Option<&AddressRecord>) -> Popup {
    let title = if view.situs != NOT_AVAILABLE {
        view.situs.clone()
    } else {
        hover_label(view)
    };

    let mut lines = Vec::new();
    let mut push = |label: &str, value: String| {
        lines.push(PopupLine { label: label.to_string(), value });
    };

    push("Account", hover_label(view));
    push("Data Source", view.source.label().to_string());
    let value = if view.total_value == 0.0 {
        NOT_AVAILABLE.to_string()
    } else {
        format_dollars(view.total_value)
    };
    push("Total Value", value);
    push("Quality", view.quality_category.clone());
    push("View", view.view_category.clone());
    push("Subdivision", view.subdivision.clone());
    push("Year Built", view.year_built.clone());

    if let Some(owner) = &view.owner_name {
        push("Owner", owner.clone());
    }
    if let Some(number) = &view.parcel_number {
        push("Parcel Number", number.clone());
    }
    if let Some(address) = address {
        if let Some(line) = &address.address {
            push("Address", line.clone());
        }
        if let Some(city) = &address.city {
            push("City", city.clone());
        }
        if let Some(zip) = &address.zip {
            push("Zip", zip.clone());
        }
    }

    Popup { title, lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DataSource;

    fn value_of<'a>(popup: &'a Popup, label: &str) -> Option<&'a str> {
        popup.lines.iter().find(|l| l.label == label).map(|l| l.value.as_str())
    }

    #[test]
    fn test_format_dollars() {
        assert_eq!(format_dollars(0.0), "$0");
        assert_eq!(format_dollars(999.0), "$999");
        assert_eq!(format_dollars(350000.0), "$350,000");
        assert_eq!(format_dollars(1234567.4), "$1,234,567");
        assert_eq!(format_dollars(-2500.0), "-$2,500");
    }

    #[test]
    fn test_popup_with_address() {
        let view = ResolvedAttributeView {
            source: DataSource::Property,
            account_id: Some("R1".to_string()),
            total_value: 350000.0,
            quality_category: "Good".to_string(),
            situs: "1 MAIN ST".to_string(),
            ..ResolvedAttributeView::none()
        };
        let address = AddressRecord {
            account_id: "R1".to_string(),
            address: Some("1 MAIN ST UNIT A".to_string()),
            city: Some("GOLDEN".to_string()),
            zip: None,
        };
        let popup = build(&view, Some(&address));

        assert_eq!(popup.title, "1 MAIN ST");
        assert_eq!(value_of(&popup, "Account"), Some("R1"));
        assert_eq!(value_of(&popup, "Data Source"), Some("Property records"));
        assert_eq!(value_of(&popup, "Total Value"), Some("$350,000"));
        assert_eq!(value_of(&popup, "City"), Some("GOLDEN"));
        assert_eq!(value_of(&popup, "Zip"), None);
    }

    #[test]
    fn test_popup_no_data() {
        let view = ResolvedAttributeView::none();
        let popup = build(&view, None);
        assert_eq!(popup.title, "No account");
        assert_eq!(value_of(&popup, "Total Value"), Some("N/A"));
        assert_eq!(value_of(&popup, "Data Source"), Some("No data"));
        assert_eq!(value_of(&popup, "Owner"), None);
    }
}

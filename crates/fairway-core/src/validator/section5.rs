use serde_json::Value;

use crate::artifact::Section5;
use crate::domain::{Intelligence, Ownership, RecentChange, Vendor};

/// The intelligence section is entirely optional; missing inner arrays
/// default to empty.
pub(crate) fn parse(section: Option<&Section5>) -> Intelligence {
    let Some(section) = section else {
        return Intelligence::default();
    };

    let ownership = section.ownership.as_ref().and_then(|ownership| {
        if ownership.ownership_type.trim().is_empty() && ownership.entity_name.trim().is_empty() {
            return None;
        }
        Some(Ownership {
            ownership_type: ownership.ownership_type.clone(),
            entity_name: ownership.entity_name.clone(),
            source: ownership.source.clone(),
        })
    });

    let recent_changes = section
        .recent_changes
        .iter()
        .filter(|change| !change.description.trim().is_empty())
        .map(|change| RecentChange {
            change_type: change.change_type.clone(),
            description: change.description.clone(),
            date: change.date.clone(),
            source: change.source.clone(),
        })
        .collect();

    let vendors = section
        .current_vendors
        .iter()
        .filter(|vendor| !vendor.vendor_name.trim().is_empty())
        .map(|vendor| Vendor {
            vendor_type: vendor.vendor_type.clone(),
            vendor_name: vendor.vendor_name.clone(),
            source: vendor.source.clone(),
        })
        .collect();

    let selling_points = section
        .selling_points
        .iter()
        .filter_map(|point| match point {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        })
        .collect();

    Intelligence {
        ownership,
        recent_changes,
        vendors,
        selling_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(raw: &str) -> Section5 {
        serde_json::from_str(raw).expect("section shape")
    }

    #[test]
    fn missing_section_defaults_to_empty() {
        let intel = parse(None);
        assert!(intel.ownership.is_none());
        assert!(intel.recent_changes.is_empty());
        assert!(intel.vendors.is_empty());
        assert!(intel.selling_points.is_empty());
    }

    #[test]
    fn populated_section_carries_through() {
        let intel = parse(Some(&section(
            r#"{
                "ownership": {"type": "Private club", "entity_name": "Heritage Golf Group", "source": "https://news.test"},
                "recent_changes": [
                    {"change_type": "renovation", "description": "Greens rebuilt in 2024", "date": "2024-05-01", "source": "https://news.test/reno"},
                    {"change_type": "noise", "description": "  "}
                ],
                "current_vendors": [{"vendor_type": "range_balls", "vendor_name": "Titleist", "source": "https://club.test/shop"}],
                "selling_points": ["Ranked #1 in state", 17, ""]
            }"#,
        )));

        assert_eq!(
            intel.ownership.expect("present").entity_name,
            "Heritage Golf Group"
        );
        assert_eq!(intel.recent_changes.len(), 1);
        assert_eq!(intel.vendors.len(), 1);
        assert_eq!(intel.selling_points, vec![String::from("Ranked #1 in state")]);
    }

    #[test]
    fn blank_ownership_collapses_to_none() {
        let intel = parse(Some(&section(
            r#"{"ownership": {"type": "", "entity_name": "", "source": ""}}"#,
        )));
        assert!(intel.ownership.is_none());
    }
}

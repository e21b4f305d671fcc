// ── Physical address ──

use serde::{Deserialize, Serialize};

/// Postal address plus coordinates, shared by sites and buildings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone_id: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `"street, city, state zip, country"`, skipping absent parts.
    pub fn one_line(&self) -> String {
        let state_zip = [self.state.as_deref(), self.zip.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        [
            self.street.as_deref(),
            self.city.as_deref(),
            Some(state_zip.as_str()),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_skips_missing_parts() {
        let address = Address {
            street: Some("1 Main St".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip: Some("78701".into()),
            ..Address::default()
        };
        assert_eq!(address.one_line(), "1 Main St, Austin, TX 78701");
        assert_eq!(Address::default().one_line(), "");
        assert!(Address::default().is_empty());
    }
}

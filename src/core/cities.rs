use serde::Serialize;

use crate::core::qibla::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub region: &'static str,
}

impl City {
    const fn new(name: &'static str, latitude: f64, longitude: f64, region: &'static str) -> Self {
        Self { name, latitude, longitude, region }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Cities offered for quick selection, with coordinates.
pub const FEATURED_CITIES: [City; 20] = [
    City::new("Algiers", 36.7538, 3.0588, "North"),
    City::new("Oran", 35.6969, -0.6331, "West"),
    City::new("Constantine", 36.365, 6.6147, "East"),
    City::new("Annaba", 36.9, 7.7667, "East"),
    City::new("Blida", 36.4203, 2.8277, "North"),
    City::new("Batna", 35.5559, 6.174, "East"),
    City::new("Djelfa", 34.6792, 3.2631, "Central"),
    City::new("Sétif", 36.1919, 5.4133, "East"),
    City::new("Sidi Bel Abbès", 35.1977, -0.6388, "West"),
    City::new("Biskra", 34.8481, 5.7281, "South"),
    City::new("Tébessa", 35.4075, 8.1244, "East"),
    City::new("El Oued", 33.3569, 6.8531, "South"),
    City::new("Skikda", 36.8761, 6.9086, "East"),
    City::new("Tiaret", 35.3712, 1.317, "West"),
    City::new("Béjaïa", 36.7525, 5.0844, "East"),
    City::new("Tlemcen", 34.8786, -1.315, "West"),
    City::new("Ouargla", 31.9539, 5.3295, "South"),
    City::new("Mostaganem", 35.9315, 0.089, "West"),
    City::new("Bordj Bou Arréridj", 36.0731, 4.7617, "East"),
    City::new("Chlef", 36.1654, 1.3347, "West"),
];

/// Capitals of all 58 wilayas, in wilaya code order.
pub const WILAYA_CAPITALS: [&str; 58] = [
    "Adrar", "Chlef", "Laghouat", "Oum El Bouaghi", "Batna", "Béjaïa", "Biskra", "Béchar",
    "Blida", "Bouira", "Tamanrasset", "Tébessa", "Tlemcen", "Tiaret", "Tizi Ouzou", "Algiers",
    "Djelfa", "Jijel", "Sétif", "Saïda", "Skikda", "Sidi Bel Abbès", "Annaba", "Guelma",
    "Constantine", "Médéa", "Mostaganem", "M'Sila", "Mascara", "Ouargla", "Oran", "El Bayadh",
    "Illizi", "Bordj Bou Arréridj", "Boumerdès", "El Tarf", "Tindouf", "Tissemsilt", "El Oued",
    "Khenchela", "Souk Ahras", "Tipaza", "Mila", "Aïn Defla", "Naama", "Aïn Témouchent", "Ghardaïa",
    "Relizane", "Timimoun", "Bordj Badji Mokhtar", "Ouled Djellal", "Béni Abbès", "In Salah",
    "In Guezzam", "Touggourt", "Djanet", "El M'Ghair", "El Meniaa",
];

/// Featured cities whose name contains `term`, ignoring case.
pub fn search(term: &str) -> Vec<&'static City> {
    let needle = term.trim().to_lowercase();
    FEATURED_CITIES
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect()
}

/// The featured city named exactly `term`, ignoring case and surrounding
/// whitespace. Partial names never match.
pub fn find(term: &str) -> Option<&'static City> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    FEATURED_CITIES
        .iter()
        .find(|c| c.name.to_lowercase() == needle)
}

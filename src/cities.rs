use crate::types::City;

const fn city(name: &'static str, lat: f64, lon: f64) -> City {
    City { name, lat, lon }
}

/// The thirty largest German cities, in display order.
pub static CITIES: [City; 30] = [
    city("Berlin", 52.520008, 13.404954),
    city("Hamburg", 53.551086, 9.993682),
    city("München", 48.137154, 11.576124),
    city("Köln", 50.937531, 6.960279),
    city("Frankfurt am Main", 50.110924, 8.682127),
    city("Stuttgart", 48.77845, 9.180013),
    city("Düsseldorf", 51.227741, 6.773456),
    city("Dortmund", 51.513587, 7.465298),
    city("Essen", 51.455643, 7.011555),
    city("Leipzig", 51.339695, 12.373075),
    city("Bremen", 53.079296, 8.801694),
    city("Dresden", 51.050409, 13.737262),
    city("Hannover", 52.375892, 9.73201),
    city("Nürnberg", 49.452103, 11.076665),
    city("Duisburg", 51.434408, 6.762329),
    city("Bochum", 51.481845, 7.216236),
    city("Wuppertal", 51.256213, 7.150764),
    city("Bielefeld", 52.030228, 8.532471),
    city("Bonn", 50.73743, 7.098207),
    city("Münster", 51.960665, 7.626135),
    city("Karlsruhe", 49.00689, 8.403653),
    city("Mannheim", 49.487459, 8.466039),
    city("Augsburg", 48.370545, 10.89779),
    city("Wiesbaden", 50.078218, 8.239761),
    city("Gelsenkirchen", 51.517744, 7.085717),
    city("Mönchengladbach", 51.180457, 6.442804),
    city("Braunschweig", 52.268874, 10.52677),
    city("Chemnitz", 50.827845, 12.92137),
    city("Kiel", 54.323293, 10.122765),
    city("Aachen", 50.775346, 6.083887),
];

pub fn find(name: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

impl City {
    /// Popup body: name on the first line, coordinates to four decimals on the second.
    pub fn popup_text(&self) -> String {
        format!("{}\n{:.4}, {:.4}", self.name, self.lat, self.lon)
    }
}

//! INSEE code utilities.
//!
//! Provides the department → region mapping for the 101 French departments
//! (post-2016 regions), plus normalization helpers for the department,
//! commune and postcode keys found in DVF exports.

/// INSEE region codes and names.
pub const REGIONS: &[(&str, &str)] = &[
    ("01", "Guadeloupe"),
    ("02", "Martinique"),
    ("03", "Guyane"),
    ("04", "La Réunion"),
    ("06", "Mayotte"),
    ("11", "Île-de-France"),
    ("24", "Centre-Val de Loire"),
    ("27", "Bourgogne-Franche-Comté"),
    ("28", "Normandie"),
    ("32", "Hauts-de-France"),
    ("44", "Grand Est"),
    ("52", "Pays de la Loire"),
    ("53", "Bretagne"),
    ("75", "Nouvelle-Aquitaine"),
    ("76", "Occitanie"),
    ("84", "Auvergne-Rhône-Alpes"),
    ("93", "Provence-Alpes-Côte d'Azur"),
    ("94", "Corse"),
];

/// INSEE department codes with their name and region code.
pub const DEPARTMENTS: &[(&str, &str, &str)] = &[
    ("01", "Ain", "84"),
    ("02", "Aisne", "32"),
    ("03", "Allier", "84"),
    ("04", "Alpes-de-Haute-Provence", "93"),
    ("05", "Hautes-Alpes", "93"),
    ("06", "Alpes-Maritimes", "93"),
    ("07", "Ardèche", "84"),
    ("08", "Ardennes", "44"),
    ("09", "Ariège", "76"),
    ("10", "Aube", "44"),
    ("11", "Aude", "76"),
    ("12", "Aveyron", "76"),
    ("13", "Bouches-du-Rhône", "93"),
    ("14", "Calvados", "28"),
    ("15", "Cantal", "84"),
    ("16", "Charente", "75"),
    ("17", "Charente-Maritime", "75"),
    ("18", "Cher", "24"),
    ("19", "Corrèze", "75"),
    ("2A", "Corse-du-Sud", "94"),
    ("2B", "Haute-Corse", "94"),
    ("21", "Côte-d'Or", "27"),
    ("22", "Côtes-d'Armor", "53"),
    ("23", "Creuse", "75"),
    ("24", "Dordogne", "75"),
    ("25", "Doubs", "27"),
    ("26", "Drôme", "84"),
    ("27", "Eure", "28"),
    ("28", "Eure-et-Loir", "24"),
    ("29", "Finistère", "53"),
    ("30", "Gard", "76"),
    ("31", "Haute-Garonne", "76"),
    ("32", "Gers", "76"),
    ("33", "Gironde", "75"),
    ("34", "Hérault", "76"),
    ("35", "Ille-et-Vilaine", "53"),
    ("36", "Indre", "24"),
    ("37", "Indre-et-Loire", "24"),
    ("38", "Isère", "84"),
    ("39", "Jura", "27"),
    ("40", "Landes", "75"),
    ("41", "Loir-et-Cher", "24"),
    ("42", "Loire", "84"),
    ("43", "Haute-Loire", "84"),
    ("44", "Loire-Atlantique", "52"),
    ("45", "Loiret", "24"),
    ("46", "Lot", "76"),
    ("47", "Lot-et-Garonne", "75"),
    ("48", "Lozère", "76"),
    ("49", "Maine-et-Loire", "52"),
    ("50", "Manche", "28"),
    ("51", "Marne", "44"),
    ("52", "Haute-Marne", "44"),
    ("53", "Mayenne", "52"),
    ("54", "Meurthe-et-Moselle", "44"),
    ("55", "Meuse", "44"),
    ("56", "Morbihan", "53"),
    ("57", "Moselle", "44"),
    ("58", "Nièvre", "27"),
    ("59", "Nord", "32"),
    ("60", "Oise", "32"),
    ("61", "Orne", "28"),
    ("62", "Pas-de-Calais", "32"),
    ("63", "Puy-de-Dôme", "84"),
    ("64", "Pyrénées-Atlantiques", "75"),
    ("65", "Hautes-Pyrénées", "76"),
    ("66", "Pyrénées-Orientales", "76"),
    ("67", "Bas-Rhin", "44"),
    ("68", "Haut-Rhin", "44"),
    ("69", "Rhône", "84"),
    ("70", "Haute-Saône", "27"),
    ("71", "Saône-et-Loire", "27"),
    ("72", "Sarthe", "52"),
    ("73", "Savoie", "84"),
    ("74", "Haute-Savoie", "84"),
    ("75", "Paris", "11"),
    ("76", "Seine-Maritime", "28"),
    ("77", "Seine-et-Marne", "11"),
    ("78", "Yvelines", "11"),
    ("79", "Deux-Sèvres", "75"),
    ("80", "Somme", "32"),
    ("81", "Tarn", "76"),
    ("82", "Tarn-et-Garonne", "76"),
    ("83", "Var", "93"),
    ("84", "Vaucluse", "93"),
    ("85", "Vendée", "52"),
    ("86", "Vienne", "75"),
    ("87", "Haute-Vienne", "75"),
    ("88", "Vosges", "44"),
    ("89", "Yonne", "27"),
    ("90", "Territoire de Belfort", "27"),
    ("91", "Essonne", "11"),
    ("92", "Hauts-de-Seine", "11"),
    ("93", "Seine-Saint-Denis", "11"),
    ("94", "Val-de-Marne", "11"),
    ("95", "Val-d'Oise", "11"),
    ("971", "Guadeloupe", "01"),
    ("972", "Martinique", "02"),
    ("973", "Guyane", "03"),
    ("974", "La Réunion", "04"),
    ("976", "Mayotte", "06"),
];

/// Maps a department code to its region code.
#[must_use]
pub fn region_of_department(department: &str) -> Option<&'static str> {
    DEPARTMENTS
        .iter()
        .find(|(code, _, _)| *code == department)
        .map(|(_, _, region)| *region)
}

/// Normalizes a raw DVF department code (`"1"` → `"01"`, `"2a"` → `"2A"`).
///
/// Returns `None` for empty input.
#[must_use]
pub fn normalize_department_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let upper = raw.to_ascii_uppercase();
    if upper.len() == 1 && upper.bytes().all(|b| b.is_ascii_digit()) {
        return Some(format!("0{upper}"));
    }
    Some(upper)
}

/// Builds the five-character INSEE commune code from a department code and
/// a DVF commune code.
///
/// Overseas departments have three-character codes but only their first
/// two characters prefix the commune code (`"971"` + `"101"` → `"97101"`).
/// Geolocated exports already carry the full code, which is kept as is.
#[must_use]
pub fn commune_insee_code(department: &str, commune: &str) -> Option<String> {
    let commune = commune.trim();
    if commune.len() == 5 {
        return Some(commune.to_ascii_uppercase());
    }
    if commune.is_empty() || commune.len() > 3 {
        return None;
    }
    let prefix = department.get(..2)?;
    Some(format!("{prefix}{commune:0>3}"))
}

/// Zero-pads a raw DVF postcode to five digits (`"1000"` → `"01000"`).
///
/// DVF may serialize postcodes as floats (`"75011.0"`); the fraction is
/// dropped. Returns `None` for empty or non-numeric input.
#[must_use]
pub fn normalize_postcode(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw.split_once('.').map_or(raw, |(int, _)| int);
    if digits.is_empty() || digits.len() > 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{digits:0>5}"))
}

/// Derives the department code that a commune code belongs to.
#[must_use]
pub fn department_of_commune(commune: &str) -> Option<&str> {
    if commune.starts_with("97") {
        commune.get(..3)
    } else {
        commune.get(..2)
    }
}

/// Derives the department that a postcode is issued under.
///
/// Corsican postcodes all start with `20`: `200xx`/`201xx` belong to
/// Corse-du-Sud, the rest to Haute-Corse.
#[must_use]
pub fn department_of_postcode(postcode: &str) -> Option<String> {
    if postcode.len() != 5 {
        return None;
    }
    if postcode.starts_with("20") {
        let third = postcode.as_bytes()[2];
        return Some(if third <= b'1' { "2A" } else { "2B" }.to_string());
    }
    department_of_commune(postcode).map(str::to_string)
}

/// Derives the commune an IRIS unit belongs to (its first five characters).
#[must_use]
pub fn commune_of_iris(iris: &str) -> Option<&str> {
    if iris.len() != 9 {
        return None;
    }
    iris.get(..5)
}

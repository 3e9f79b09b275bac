// src/model/elements.rs

/// Linear RGB triple with channels in `0.0..=1.0`.
pub type Rgb = (f64, f64, f64);

pub struct Element {
    pub symbol: &'static str,
    /// Covalent radius in Angstroms (Cordero et al. 2008). Elements without a
    /// tabulated value carry a 0.2 placeholder.
    pub covalent_radius: f64,
    /// Jmol colour scheme.
    pub color: Rgb,
}

const fn el(symbol: &'static str, covalent_radius: f64, color: Rgb) -> Element {
    Element {
        symbol,
        covalent_radius,
        color,
    }
}

/// Indexed by atomic number. Entry 0 is the dummy atom "X".
pub static ELEMENTS: [Element; 104] = [
    el("X", 0.20, (1.000, 0.000, 0.000)), // 0
    el("H", 0.31, (1.000, 1.000, 1.000)), // 1
    el("He", 0.28, (0.851, 1.000, 1.000)), // 2
    el("Li", 1.28, (0.800, 0.502, 1.000)), // 3
    el("Be", 0.96, (0.761, 1.000, 0.000)), // 4
    el("B", 0.84, (1.000, 0.710, 0.710)), // 5
    el("C", 0.76, (0.565, 0.565, 0.565)), // 6
    el("N", 0.71, (0.188, 0.314, 0.973)), // 7
    el("O", 0.66, (1.000, 0.051, 0.051)), // 8
    el("F", 0.57, (0.565, 0.878, 0.314)), // 9
    el("Ne", 0.58, (0.702, 0.890, 0.961)), // 10
    el("Na", 1.66, (0.671, 0.361, 0.949)), // 11
    el("Mg", 1.41, (0.541, 1.000, 0.000)), // 12
    el("Al", 1.21, (0.749, 0.651, 0.651)), // 13
    el("Si", 1.11, (0.941, 0.784, 0.627)), // 14
    el("P", 1.07, (1.000, 0.502, 0.000)), // 15
    el("S", 1.05, (1.000, 1.000, 0.188)), // 16
    el("Cl", 1.02, (0.122, 0.941, 0.122)), // 17
    el("Ar", 1.06, (0.502, 0.820, 0.890)), // 18
    el("K", 2.03, (0.561, 0.251, 0.831)), // 19
    el("Ca", 1.76, (0.239, 1.000, 0.000)), // 20
    el("Sc", 1.70, (0.902, 0.902, 0.902)), // 21
    el("Ti", 1.60, (0.749, 0.761, 0.780)), // 22
    el("V", 1.53, (0.651, 0.651, 0.671)), // 23
    el("Cr", 1.39, (0.541, 0.600, 0.780)), // 24
    el("Mn", 1.39, (0.612, 0.478, 0.780)), // 25
    el("Fe", 1.32, (0.878, 0.400, 0.200)), // 26
    el("Co", 1.26, (0.941, 0.565, 0.627)), // 27
    el("Ni", 1.24, (0.314, 0.816, 0.314)), // 28
    el("Cu", 1.32, (0.784, 0.502, 0.200)), // 29
    el("Zn", 1.22, (0.490, 0.502, 0.690)), // 30
    el("Ga", 1.22, (0.761, 0.561, 0.561)), // 31
    el("Ge", 1.20, (0.400, 0.561, 0.561)), // 32
    el("As", 1.19, (0.741, 0.502, 0.890)), // 33
    el("Se", 1.20, (1.000, 0.631, 0.000)), // 34
    el("Br", 1.20, (0.651, 0.161, 0.161)), // 35
    el("Kr", 1.16, (0.361, 0.722, 0.820)), // 36
    el("Rb", 2.20, (0.439, 0.180, 0.690)), // 37
    el("Sr", 1.95, (0.000, 1.000, 0.000)), // 38
    el("Y", 1.90, (0.580, 1.000, 1.000)), // 39
    el("Zr", 1.75, (0.580, 0.878, 0.878)), // 40
    el("Nb", 1.64, (0.451, 0.761, 0.788)), // 41
    el("Mo", 1.54, (0.329, 0.710, 0.710)), // 42
    el("Tc", 1.47, (0.231, 0.620, 0.620)), // 43
    el("Ru", 1.46, (0.141, 0.561, 0.561)), // 44
    el("Rh", 1.42, (0.039, 0.490, 0.549)), // 45
    el("Pd", 1.39, (0.000, 0.412, 0.522)), // 46
    el("Ag", 1.45, (0.753, 0.753, 0.753)), // 47
    el("Cd", 1.44, (1.000, 0.851, 0.561)), // 48
    el("In", 1.42, (0.651, 0.459, 0.451)), // 49
    el("Sn", 1.39, (0.400, 0.502, 0.502)), // 50
    el("Sb", 1.39, (0.620, 0.388, 0.710)), // 51
    el("Te", 1.38, (0.831, 0.478, 0.000)), // 52
    el("I", 1.39, (0.580, 0.000, 0.580)), // 53
    el("Xe", 1.40, (0.259, 0.620, 0.690)), // 54
    el("Cs", 2.44, (0.341, 0.090, 0.561)), // 55
    el("Ba", 2.15, (0.000, 0.788, 0.000)), // 56
    el("La", 2.07, (0.439, 0.831, 1.000)), // 57
    el("Ce", 2.04, (1.000, 1.000, 0.780)), // 58
    el("Pr", 2.03, (0.851, 1.000, 0.780)), // 59
    el("Nd", 2.01, (0.780, 1.000, 0.780)), // 60
    el("Pm", 1.99, (0.639, 1.000, 0.780)), // 61
    el("Sm", 1.98, (0.561, 1.000, 0.780)), // 62
    el("Eu", 1.98, (0.380, 1.000, 0.780)), // 63
    el("Gd", 1.96, (0.271, 1.000, 0.780)), // 64
    el("Tb", 1.94, (0.188, 1.000, 0.780)), // 65
    el("Dy", 1.92, (0.122, 1.000, 0.780)), // 66
    el("Ho", 1.92, (0.000, 1.000, 0.612)), // 67
    el("Er", 1.89, (0.000, 0.902, 0.459)), // 68
    el("Tm", 1.90, (0.000, 0.831, 0.322)), // 69
    el("Yb", 1.87, (0.000, 0.749, 0.220)), // 70
    el("Lu", 1.87, (0.000, 0.671, 0.141)), // 71
    el("Hf", 1.75, (0.302, 0.761, 1.000)), // 72
    el("Ta", 1.70, (0.302, 0.651, 1.000)), // 73
    el("W", 1.62, (0.129, 0.580, 0.839)), // 74
    el("Re", 1.51, (0.149, 0.490, 0.671)), // 75
    el("Os", 1.44, (0.149, 0.400, 0.588)), // 76
    el("Ir", 1.41, (0.090, 0.329, 0.529)), // 77
    el("Pt", 1.36, (0.816, 0.816, 0.878)), // 78
    el("Au", 1.36, (1.000, 0.820, 0.137)), // 79
    el("Hg", 1.32, (0.722, 0.722, 0.816)), // 80
    el("Tl", 1.45, (0.651, 0.329, 0.302)), // 81
    el("Pb", 1.46, (0.341, 0.349, 0.380)), // 82
    el("Bi", 1.48, (0.620, 0.310, 0.710)), // 83
    el("Po", 1.40, (0.671, 0.361, 0.000)), // 84
    el("At", 1.50, (0.459, 0.310, 0.271)), // 85
    el("Rn", 1.50, (0.259, 0.510, 0.588)), // 86
    el("Fr", 2.60, (0.259, 0.000, 0.400)), // 87
    el("Ra", 2.21, (0.000, 0.490, 0.000)), // 88
    el("Ac", 2.15, (0.439, 0.671, 0.980)), // 89
    el("Th", 2.06, (0.000, 0.729, 1.000)), // 90
    el("Pa", 2.00, (0.000, 0.631, 1.000)), // 91
    el("U", 1.96, (0.000, 0.561, 1.000)), // 92
    el("Np", 1.90, (0.000, 0.502, 1.000)), // 93
    el("Pu", 1.87, (0.000, 0.420, 1.000)), // 94
    el("Am", 1.80, (0.329, 0.361, 0.949)), // 95
    el("Cm", 1.69, (0.471, 0.361, 0.890)), // 96
    el("Bk", 0.20, (0.541, 0.310, 0.890)), // 97
    el("Cf", 0.20, (0.631, 0.212, 0.831)), // 98
    el("Es", 0.20, (0.702, 0.122, 0.831)), // 99
    el("Fm", 0.20, (0.702, 0.122, 0.729)), // 100
    el("Md", 0.20, (0.702, 0.051, 0.651)), // 101
    el("No", 0.20, (0.741, 0.051, 0.529)), // 102
    el("Lr", 0.20, (0.780, 0.000, 0.400)), // 103
];

/// Highest atomic number with an entry in [`ELEMENTS`].
pub const MAX_ATOMIC_NUMBER: u8 = (ELEMENTS.len() - 1) as u8;

pub fn element(number: u8) -> Option<&'static Element> {
    ELEMENTS.get(number as usize)
}

/// Returns (radius_in_angstroms, (r, g, b)) for an atomic number.
pub fn get_atom_properties(number: u8) -> Option<(f64, Rgb)> {
    element(number).map(|e| (e.covalent_radius, e.color))
}

pub fn covalent_radius(number: u8) -> Option<f64> {
    element(number).map(|e| e.covalent_radius)
}

pub fn jmol_color(number: u8) -> Option<Rgb> {
    element(number).map(|e| e.color)
}

pub fn symbol(number: u8) -> Option<&'static str> {
    element(number).map(|e| e.symbol)
}

/// Returns the atomic number for an element symbol or a site label.
///
/// Labels such as `Fe2`, `O1`, `Ti4+` or `sr` resolve to their element. A
/// two-letter symbol is only taken when the second letter is lower case, so
/// `CO` is read as carbon.
pub fn get_atomic_number(label: &str) -> Option<u8> {
    let mut chars = label.trim().chars().skip_while(|c| !c.is_ascii_alphabetic());
    let first = chars.next()?.to_ascii_uppercase();

    let mut one = String::with_capacity(2);
    one.push(first);

    if let Some(second) = chars.next().filter(|c| c.is_ascii_lowercase()) {
        let mut two = one.clone();
        two.push(second);
        if let Some(z) = lookup(&two) {
            return Some(z);
        }
    }
    lookup(&one)
}

fn lookup(symbol: &str) -> Option<u8> {
    ELEMENTS
        .iter()
        .position(|e| e.symbol == symbol)
        .map(|z| z as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_atomic_number() {
        assert_eq!(symbol(1), Some("H"));
        assert_eq!(symbol(8), Some("O"));
        assert_eq!(symbol(22), Some("Ti"));
        assert_eq!(symbol(38), Some("Sr"));
        assert_eq!(symbol(MAX_ATOMIC_NUMBER), Some("Lr"));
        assert!(element(MAX_ATOMIC_NUMBER + 1).is_none());
    }

    #[test]
    fn labels_resolve_to_elements() {
        assert_eq!(get_atomic_number("Sr"), Some(38));
        assert_eq!(get_atomic_number("Fe2"), Some(26));
        assert_eq!(get_atomic_number("Ti4+"), Some(22));
        assert_eq!(get_atomic_number("O1"), Some(8));
        assert_eq!(get_atomic_number("sr"), Some(38));
        assert_eq!(get_atomic_number("CO"), Some(6));
        assert_eq!(get_atomic_number("X"), Some(0));
        assert_eq!(get_atomic_number("Qq"), None);
        assert_eq!(get_atomic_number("12"), None);
    }

    #[test]
    fn properties_match_reference_values() {
        let (r, (red, green, blue)) = get_atom_properties(8).unwrap();
        assert!((r - 0.66).abs() < 1e-12);
        assert!((red - 1.0).abs() < 1e-12);
        assert!(green < 0.1 && blue < 0.1);

        assert!((covalent_radius(38).unwrap() - 1.95).abs() < 1e-12);
        assert_eq!(jmol_color(38), Some((0.0, 1.0, 0.0)));
        assert!(get_atom_properties(200).is_none());
    }
}

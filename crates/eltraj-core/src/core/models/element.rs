use phf::phf_map;
use std::borrow::Cow;
use thiserror::Error;

/// Static data for one chemical element.
///
/// Covalent radii are the Cordero et al. (2008) values, which is the table ASE uses
/// for `natural_cutoffs`; masses are standard atomic weights in Daltons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// Atomic number.
    pub number: u16,
    /// Chemical symbol (e.g. "Li").
    pub symbol: &'static str,
    /// Covalent radius in Angstroms.
    pub covalent_radius: f64,
    /// Standard atomic mass in Daltons.
    pub mass: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("Unknown chemical symbol: '{0}'")]
    UnknownSymbol(String),
    #[error("No element data for atomic number {0}")]
    UnknownNumber(u16),
}

macro_rules! element {
    ($z:expr, $sym:expr, $r:expr, $m:expr) => {
        Element {
            number: $z,
            symbol: $sym,
            covalent_radius: $r,
            mass: $m,
        }
    };
}

static ELEMENTS: [Element; 36] = [
    element!(1, "H", 0.31, 1.008),
    element!(2, "He", 0.28, 4.002602),
    element!(3, "Li", 1.28, 6.94),
    element!(4, "Be", 0.96, 9.0121831),
    element!(5, "B", 0.84, 10.81),
    element!(6, "C", 0.76, 12.011),
    element!(7, "N", 0.71, 14.007),
    element!(8, "O", 0.66, 15.999),
    element!(9, "F", 0.57, 18.998403163),
    element!(10, "Ne", 0.58, 20.1797),
    element!(11, "Na", 1.66, 22.98976928),
    element!(12, "Mg", 1.41, 24.305),
    element!(13, "Al", 1.21, 26.9815385),
    element!(14, "Si", 1.11, 28.085),
    element!(15, "P", 1.07, 30.973761998),
    element!(16, "S", 1.05, 32.06),
    element!(17, "Cl", 1.02, 35.45),
    element!(18, "Ar", 1.06, 39.948),
    element!(19, "K", 2.03, 39.0983),
    element!(20, "Ca", 1.76, 40.078),
    element!(21, "Sc", 1.70, 44.955908),
    element!(22, "Ti", 1.60, 47.867),
    element!(23, "V", 1.53, 50.9415),
    element!(24, "Cr", 1.39, 51.9961),
    element!(25, "Mn", 1.39, 54.938044),
    element!(26, "Fe", 1.32, 55.845),
    element!(27, "Co", 1.26, 58.933194),
    element!(28, "Ni", 1.24, 58.6934),
    element!(29, "Cu", 1.32, 63.546),
    element!(30, "Zn", 1.22, 65.38),
    element!(31, "Ga", 1.22, 69.723),
    element!(32, "Ge", 1.20, 72.63),
    element!(33, "As", 1.19, 74.921595),
    element!(34, "Se", 1.20, 78.971),
    element!(35, "Br", 1.20, 79.904),
    element!(36, "Kr", 1.16, 83.798),
];

static SYMBOL_TO_NUMBER: phf::Map<&'static str, u16> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6,
    "N" => 7, "O" => 8, "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12,
    "Al" => 13, "Si" => 14, "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18,
    "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22, "V" => 23, "Cr" => 24,
    "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30,
    "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
};

impl Element {
    pub fn from_number(number: u16) -> Result<&'static Element, ElementError> {
        number
            .checked_sub(1)
            .and_then(|idx| ELEMENTS.get(idx as usize))
            .ok_or(ElementError::UnknownNumber(number))
    }

    pub fn from_symbol(symbol: &str) -> Result<&'static Element, ElementError> {
        let number = SYMBOL_TO_NUMBER
            .get(symbol)
            .ok_or_else(|| ElementError::UnknownSymbol(symbol.to_string()))?;
        Self::from_number(*number)
    }
}

/// Returns the chemical symbol for an atomic number.
///
/// Numbers outside the table (for instance species that were shifted to tag a
/// molecular environment) are rendered as `Z<number>` so they stay distinguishable.
pub fn symbol_for(number: u16) -> Cow<'static, str> {
    match Element::from_number(number) {
        Ok(el) => Cow::Borrowed(el.symbol),
        Err(_) => Cow::Owned(format!("Z{}", number)),
    }
}

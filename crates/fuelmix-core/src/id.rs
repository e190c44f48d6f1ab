use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element symbols indexed by atomic number minus one.
const ELEMENTS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// A nuclide in `ZZZAAAMMMM` form (U-235 is `922350000`). Cheap to copy and
/// ordered so compositions iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nuclide(pub u32);

impl Nuclide {
    pub const U235: Nuclide = Nuclide(922350000);
    pub const U238: Nuclide = Nuclide(922380000);
    pub const PU239: Nuclide = Nuclide(942390000);

    /// Build a nuclide from atomic number, mass number and metastable state.
    pub fn new(z: u32, a: u32, state: u32) -> Result<Self, NuclideParseError> {
        if z == 0 || z as usize > ELEMENTS.len() {
            return Err(NuclideParseError::UnknownElement(z.to_string()));
        }
        if a < z || a >= 1000 || state >= 10_000 {
            return Err(NuclideParseError::BadMassNumber(format!("{z}/{a}/{state}")));
        }
        Ok(Nuclide(z * 10_000_000 + a * 10_000 + state))
    }

    pub fn z(self) -> u32 {
        self.0 / 10_000_000
    }

    pub fn a(self) -> u32 {
        (self.0 / 10_000) % 1000
    }

    pub fn state(self) -> u32 {
        self.0 % 10_000
    }
}

/// Errors from parsing a nuclide string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NuclideParseError {
    #[error("empty nuclide string")]
    Empty,
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("invalid mass number in nuclide: {0}")]
    BadMassNumber(String),
}

impl FromStr for Nuclide {
    type Err = NuclideParseError;

    /// Accepts canonical ids (`"922350000"`) and symbols with an optional
    /// dash and metastable suffix (`"U235"`, `"pu-239"`, `"Am242m"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NuclideParseError::Empty);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let id: u32 = s
                .parse()
                .map_err(|_| NuclideParseError::BadMassNumber(s.to_string()))?;
            let state = id % 10_000;
            let a = (id / 10_000) % 1000;
            return Nuclide::new(id / 10_000_000, a, state);
        }

        let split = s.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(s.len());
        let (symbol, rest) = s.split_at(split);
        let z = ELEMENTS
            .iter()
            .position(|e| e.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| NuclideParseError::UnknownElement(symbol.to_string()))?
            as u32
            + 1;

        let rest = rest.strip_prefix('-').unwrap_or(rest);
        let (digits, state) = match rest.strip_suffix(['m', 'M']) {
            Some(d) => (d, 1),
            None => (rest, 0),
        };
        let a: u32 = digits
            .parse()
            .map_err(|_| NuclideParseError::BadMassNumber(s.to_string()))?;
        Nuclide::new(z, a, state)
    }
}

impl fmt::Display for Nuclide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = ELEMENTS
            .get((self.z() as usize).wrapping_sub(1))
            .copied()
            .unwrap_or("?");
        write!(f, "{symbol}{}", self.a())?;
        if self.state() > 0 {
            write!(f, "m")?;
        }
        Ok(())
    }
}

/// Identifies a recipe in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

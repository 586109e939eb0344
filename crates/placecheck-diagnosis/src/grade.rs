use serde::{Deserialize, Serialize};

/// Letter grade, ordered best first: `S > A > B > C > D > F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

/// Lower bound of each grade band, best first.
const BANDS: &[(u8, Grade)] = &[
    (95, Grade::S),
    (80, Grade::A),
    (70, Grade::B),
    (55, Grade::C),
    (40, Grade::D),
];

impl Grade {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        BANDS
            .iter()
            .find(|(min, _)| score >= *min)
            .map_or(Grade::F, |(_, grade)| *grade)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(Grade::from_score(100), Grade::S);
        assert_eq!(Grade::from_score(95), Grade::S);
        assert_eq!(Grade::from_score(94), Grade::A);
        assert_eq!(Grade::from_score(80), Grade::A);
        assert_eq!(Grade::from_score(79), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(55), Grade::C);
        assert_eq!(Grade::from_score(40), Grade::D);
        assert_eq!(Grade::from_score(39), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn serializes_as_letter() {
        assert_eq!(serde_json::to_value(Grade::S).expect("serialize"), "S");
        assert_eq!(Grade::C.to_string(), "C");
    }
}

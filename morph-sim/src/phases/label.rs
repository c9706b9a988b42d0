use std::fmt;

/// Opaque phase tag carried by a lattice site.
///
/// Labels only compare for equality; they carry no magnitude. The numeric
/// id exists for persistence and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Label(u8);

impl Label {
    /// Placeholder held by sites that no generator or import has touched.
    pub const UNASSIGNED: Label = Label(0);
    /// First phase of a two-phase blend; the bottom-face phase for tortuosity.
    pub const PRIMARY: Label = Label(1);
    /// Second phase of a two-phase blend; the top-face phase for tortuosity.
    pub const SECONDARY: Label = Label(2);

    pub const fn new(id: u8) -> Self {
        Label(id)
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    /// The other label of a `PRIMARY`/`SECONDARY` pair.
    pub fn partner(self) -> Option<Label> {
        match self {
            Label::PRIMARY => Some(Label::SECONDARY),
            Label::SECONDARY => Some(Label::PRIMARY),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Label {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.trim()
            .parse::<u8>()
            .map(Label)
            .map_err(|_| format!("invalid site label '{s}', expected an integer in 0..=255"))
    }
}

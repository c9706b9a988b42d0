/// Nearest-neighbor shell of a displacement on the simple cubic lattice,
/// i.e. its squared length: 1 (face), 2 (edge) or 3 (corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    First,
    Second,
    Third,
}

impl Shell {
    #[inline]
    pub fn of(dx: i32, dy: i32, dz: i32) -> Option<Shell> {
        match dx * dx + dy * dy + dz * dz {
            1 => Some(Shell::First),
            2 => Some(Shell::Second),
            3 => Some(Shell::Third),
            _ => None,
        }
    }

    pub const ALL: [Shell; 3] = [Shell::First, Shell::Second, Shell::Third];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Shell::First => 0,
            Shell::Second => 1,
            Shell::Third => 2,
        }
    }

    /// Euclidean length of a displacement in this shell.
    #[inline]
    pub fn distance(self) -> f32 {
        match self {
            Shell::First => 1.0,
            Shell::Second => std::f32::consts::SQRT_2,
            Shell::Third => SQRT_3,
        }
    }
}

pub const FIRST_SHELL: usize = 6;
pub const SECOND_SHELL: usize = 12;
pub const THIRD_SHELL: usize = 8;
pub const ALL_SHELLS: usize = FIRST_SHELL + SECOND_SHELL + THIRD_SHELL;

pub const SQRT_3: f32 = 1.732_050_8;

/// The six face displacements.
pub const FACES: [(i32, i32, i32); FIRST_SHELL] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// The 26 displacements of the surrounding 3x3x3 block, in `i, j, k`
/// nested order with the centre omitted.
pub fn moore() -> Vec<(i32, i32, i32)> {
    let mut out = Vec::with_capacity(ALL_SHELLS);
    for i in -1..=1 {
        for j in -1..=1 {
            for k in -1..=1 {
                if (i, j, k) != (0, 0, 0) {
                    out.push((i, j, k));
                }
            }
        }
    }
    out
}

/// All displacements within a sphere of radius² `cutoff_squared` inside the
/// cube `[-radius, radius]³`, centre included.
pub fn ball(radius: i32, cutoff_squared: i32) -> Vec<(i32, i32, i32)> {
    let mut out = Vec::new();
    for i in -radius..=radius {
        for j in -radius..=radius {
            for k in -radius..=radius {
                if i * i + j * j + k * k <= cutoff_squared {
                    out.push((i, j, k));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moore_shell_sizes() {
        let offsets = moore();
        assert_eq!(offsets.len(), 26);
        let count = |s| offsets.iter().filter(|&&(i, j, k)| Shell::of(i, j, k) == Some(s)).count();
        assert_eq!(count(Shell::First), 6);
        assert_eq!(count(Shell::Second), 12);
        assert_eq!(count(Shell::Third), 8);
    }

    #[test]
    fn test_ball() {
        // radius 1, cutoff² 2: centre + 6 faces + 12 edges
        assert_eq!(ball(1, 2).len(), 19);
        assert_eq!(ball(1, 3).len(), 27);
        assert_eq!(ball(2, 1).len(), 7);
    }
}

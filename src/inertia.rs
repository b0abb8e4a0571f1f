// ⚖️ Inertia - point mass with a location

use serde::{Deserialize, Serialize};

/// Mass (kg) concentrated at (x, y, z) in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    mass: f64,
    location: [f64; 3],
}

impl Inertia {
    pub fn new(mass: f64, location: (f64, f64, f64)) -> Self {
        Inertia {
            mass,
            location: [location.0, location.1, location.2],
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn location(&self) -> (f64, f64, f64) {
        (self.location[0], self.location[1], self.location[2])
    }

    pub fn location_x(&self) -> f64 {
        self.location[0]
    }

    pub fn location_y(&self) -> f64 {
        self.location[1]
    }

    pub fn location_z(&self) -> f64 {
        self.location[2]
    }

    /// Total mass at the mass-weighted centre of `parts`
    ///
    /// Parts may carry negative mass (removed material). A zero total puts the
    /// result at the origin.
    pub fn combine(parts: &[Inertia]) -> Inertia {
        let mass: f64 = parts.iter().map(|p| p.mass).sum();
        if mass == 0.0 {
            return Inertia::new(0.0, (0.0, 0.0, 0.0));
        }

        let mut moment = [0.0; 3];
        for part in parts {
            for (axis, m) in moment.iter_mut().enumerate() {
                *m += part.mass * part.location[axis];
            }
        }

        Inertia::new(mass, (moment[0] / mass, moment[1] / mass, moment[2] / mass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL_MASS: f64 = 100.0;

    fn inertia_object() -> Inertia {
        Inertia::new(INITIAL_MASS, (0.0, 10.0, 2.0))
    }

    #[test]
    fn test_inertia_object_location() {
        let inertia = inertia_object();

        assert!((inertia.location_x() - 0.0).abs() < 1e-12);
        assert!((inertia.location_y() - 10.0).abs() < 1e-12);
        assert!((inertia.location_z() - 2.0).abs() < 1e-12);
        assert_eq!(inertia.location(), (0.0, 10.0, 2.0));
    }

    #[test]
    fn test_inertia_object_mass() {
        assert!((inertia_object().mass() - INITIAL_MASS).abs() < 1e-12);
    }

    #[test]
    fn test_combine() {
        let a = Inertia::new(100.0, (0.0, 0.0, 0.0));
        let b = Inertia::new(300.0, (4.0, 0.0, 8.0));

        let total = Inertia::combine(&[a, b]);

        assert_eq!(total.mass(), 400.0);
        assert!((total.location_x() - 3.0).abs() < 1e-12);
        assert!((total.location_z() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_empty() {
        let total = Inertia::combine(&[]);
        assert_eq!(total.mass(), 0.0);
        assert_eq!(total.location(), (0.0, 0.0, 0.0));
    }
}

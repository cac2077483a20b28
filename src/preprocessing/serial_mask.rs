use serde::{Deserialize, Serialize};

use crate::sim::domain::Domain;

/// Obstacle geometry embedded in a run description: the interior solid cells
/// of a grid, stored sparsely.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SerialMask {
    nx: usize,
    ny: usize,
    occupied: Vec<[usize; 2]>,
}

impl SerialMask {
    pub fn from_domain(domain: &Domain) -> Self {
        let (nx, ny) = domain.shape();

        Self {
            nx,
            ny,
            occupied: domain.obstruction_cells().map(|(i, j)| [i, j]).collect(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.occupied.iter().map(|&[i, j]| (i, j))
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    pub fn test_save_load() {
        let mut rng = rand::rng();

        let occupied: Vec<(usize, usize)> = (0..20)
            .map(|_| (rng.random_range(1..9), rng.random_range(1..7)))
            .collect();
        let original = Domain::new(10, 8, 0.1, occupied).unwrap();

        let serial_mask = SerialMask::from_domain(&original);

        let serialized = serde_json::to_string(&serial_mask).unwrap();
        let deserialized: SerialMask = serde_json::from_str(&serialized).unwrap();

        let (nx, ny) = deserialized.shape();
        let restored = Domain::new(nx, ny, 0.1, deserialized.cells()).unwrap();

        assert_eq!(original, restored);
    }
}

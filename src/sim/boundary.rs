// Boundary-condition policies applied after every projection step

use na::DMatrix;
use serde::{Deserialize, Serialize};

use crate::sim::{
    ScalarField,
    domain::{Domain, FlowFields},
};

/// Constant body-force (acceleration) terms supplied by a boundary policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyForce {
    pub gx: f64,
    pub gy: f64,
}

/// Enforces the wall, inflow/outflow and obstacle constraints of one flow
/// configuration. Implementations must map finite fields to finite fields.
pub trait BoundaryCondition: Send + Sync {
    /// Overwrite the constrained cells of `fields` in place and return the
    /// body force for this configuration.
    fn apply(&self, fields: &mut FlowFields) -> BodyForce;

    fn name(&self) -> &'static str;
}

/// Boundary policy selection, as stored in a run description.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BoundaryKind {
    ObstructedFlow { gx: f64, gy: f64 },
    DrivenLid { lid_speed: f64 },
    Channel { gx: f64 },
}

impl BoundaryKind {
    /// Instantiate the policy for a given domain.
    pub fn build(&self, domain: &Domain) -> Box<dyn BoundaryCondition> {
        match *self {
            BoundaryKind::ObstructedFlow { gx, gy } => {
                Box::new(ObstructedFlow::new(domain, BodyForce { gx, gy }))
            }
            BoundaryKind::DrivenLid { lid_speed } => Box::new(DrivenLid { lid_speed }),
            BoundaryKind::Channel { gx } => Box::new(Channel { gx }),
        }
    }
}

// -- edge helpers; rows are x-indices (i), columns are y-indices (j) --

/// Zero-gradient on the left and right edges (`i = 0`, `i = Nx-1`).
fn copy_inward_x(field: &mut ScalarField) {
    let nx = field.nrows();

    let left = field.row(1).into_owned();
    field.set_row(0, &left);

    let right = field.row(nx - 2).into_owned();
    field.set_row(nx - 1, &right);
}

/// Zero-gradient on the bottom and top edges (`j = 0`, `j = Ny-1`).
fn copy_inward_y(field: &mut ScalarField) {
    let ny = field.ncols();

    let bottom = field.column(1).into_owned();
    field.set_column(0, &bottom);

    let top = field.column(ny - 2).into_owned();
    field.set_column(ny - 1, &top);
}

/// Flow around internal obstructions with open (zero-gradient) outer edges.
pub struct ObstructedFlow {
    solid_mask: DMatrix<bool>,
    obstructions: Vec<(usize, usize)>,
    force: BodyForce,
}

impl ObstructedFlow {
    pub fn new(domain: &Domain, force: BodyForce) -> Self {
        ObstructedFlow {
            solid_mask: domain.solid_mask().clone(),
            obstructions: domain.obstruction_cells().collect(),
            force,
        }
    }

    /// Mean pressure over the free diagonal neighbours of an interior cell.
    fn mirrored_pressure(&self, p: &ScalarField, (i, j): (usize, usize)) -> Option<f64> {
        let mut sum = 0.;
        let mut count = 0usize;

        for (ni, nj) in [(i + 1, j + 1), (i - 1, j - 1), (i - 1, j + 1), (i + 1, j - 1)] {
            if !self.solid_mask[(ni, nj)] {
                sum += p[(ni, nj)];
                count += 1;
            }
        }

        (count > 0).then(|| sum / count as f64)
    }
}

impl BoundaryCondition for ObstructedFlow {
    fn apply(&self, fields: &mut FlowFields) -> BodyForce {
        // obstacle cells read only free cells, so visiting order is irrelevant
        for &(i, j) in &self.obstructions {
            fields.u[0][(i, j)] = 0.;
            fields.u[1][(i, j)] = 0.;

            if let Some(p) = self.mirrored_pressure(&fields.p, (i, j)) {
                fields.p[(i, j)] = p;
            }
        }

        for field in fields.u.iter_mut().chain(std::iter::once(&mut fields.p)) {
            copy_inward_y(field);
            copy_inward_x(field);
        }

        self.force
    }

    fn name(&self) -> &'static str {
        "obstructed flow"
    }
}

/// Lid-driven cavity: the top edge slides at `lid_speed`, the other three
/// edges are no-slip walls.
pub struct DrivenLid {
    pub lid_speed: f64,
}

impl BoundaryCondition for DrivenLid {
    fn apply(&self, fields: &mut FlowFields) -> BodyForce {
        let (nx, ny) = fields.shape();

        // pressure: zero-gradient on walls, pinned on the lid
        let p = &mut fields.p;
        let right = p.row(nx - 2).into_owned();
        p.set_row(nx - 1, &right);
        let left = p.row(1).into_owned();
        p.set_row(0, &left);
        let bottom = p.column(1).into_owned();
        p.set_column(0, &bottom);
        p.column_mut(ny - 1).fill(0.);

        // no-slip walls
        for u in fields.u.iter_mut() {
            u.row_mut(nx - 1).fill(0.);
            u.row_mut(0).fill(0.);
            u.column_mut(0).fill(0.);
        }

        // the lid owns the top corners too
        fields.u[0].column_mut(ny - 1).fill(self.lid_speed);
        fields.u[1].column_mut(ny - 1).fill(0.);

        BodyForce::default()
    }

    fn name(&self) -> &'static str {
        "driven lid"
    }
}

/// Channel between two no-slip walls (bottom and top), driven by a body
/// force `gx`. Left and right edges are open.
pub struct Channel {
    pub gx: f64,
}

impl BoundaryCondition for Channel {
    fn apply(&self, fields: &mut FlowFields) -> BodyForce {
        let ny = fields.shape().1;

        for u in fields.u.iter_mut() {
            u.column_mut(0).fill(0.);
            u.column_mut(ny - 1).fill(0.);
        }

        // hold pressure flat across the three near-wall rows
        let p = &mut fields.p;
        let bottom = p.column(2).into_owned();
        p.set_column(0, &bottom);
        p.set_column(1, &bottom);
        let top = p.column(ny - 3).into_owned();
        p.set_column(ny - 1, &top);
        p.set_column(ny - 2, &top);

        for field in fields.u.iter_mut().chain(std::iter::once(&mut fields.p)) {
            copy_inward_x(field);
        }

        BodyForce { gx: self.gx, gy: 0. }
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn random_fields(nx: usize, ny: usize) -> FlowFields {
        let mut rng = rand::rng();
        let mut random = || ScalarField::from_fn(nx, ny, |_, _| rng.random_range(-2.0..2.0));

        FlowFields {
            u: [random(), random()],
            p: random(),
        }
    }

    #[test]
    fn test_driven_lid_edges() {
        let (nx, ny) = (7, 6);
        let mut fields = random_fields(nx, ny);

        let force = DrivenLid { lid_speed: 1.5 }.apply(&mut fields);
        assert_eq!(force, BodyForce::default());

        for i in 0..nx {
            assert_eq!(fields.u[0][(i, ny - 1)], 1.5);
            assert_eq!(fields.u[1][(i, ny - 1)], 0.);
            assert_eq!(fields.p[(i, ny - 1)], 0.);

            assert_eq!(fields.u[0][(i, 0)], 0.);
            assert_eq!(fields.u[1][(i, 0)], 0.);
            assert_eq!(fields.p[(i, 0)], fields.p[(i, 1)]);
        }
        for j in 0..ny - 1 {
            for u in &fields.u {
                assert_eq!(u[(0, j)], 0.);
                assert_eq!(u[(nx - 1, j)], 0.);
            }
            assert_eq!(fields.p[(0, j)], fields.p[(1, j)]);
            assert_eq!(fields.p[(nx - 1, j)], fields.p[(nx - 2, j)]);
        }
    }

    #[test]
    fn test_channel_edges() {
        let (nx, ny) = (6, 8);
        let mut fields = random_fields(nx, ny);

        let force = Channel { gx: 0.3 }.apply(&mut fields);
        assert_eq!(force, BodyForce { gx: 0.3, gy: 0. });

        for i in 0..nx {
            for u in &fields.u {
                assert_eq!(u[(i, 0)], 0.);
                assert_eq!(u[(i, ny - 1)], 0.);
            }
            assert_eq!(fields.p[(i, 0)], fields.p[(i, 2)]);
            assert_eq!(fields.p[(i, 1)], fields.p[(i, 2)]);
            assert_eq!(fields.p[(i, ny - 1)], fields.p[(i, ny - 3)]);
            assert_eq!(fields.p[(i, ny - 2)], fields.p[(i, ny - 3)]);
        }
        for j in 0..ny {
            for field in fields.u.iter().chain(std::iter::once(&fields.p)) {
                assert_eq!(field[(0, j)], field[(1, j)]);
                assert_eq!(field[(nx - 1, j)], field[(nx - 2, j)]);
            }
        }
    }

    #[test]
    fn test_obstructed_flow() {
        let domain = Domain::new(8, 7, 0.1, [(3, 3), (4, 3)]).unwrap();
        let policy = ObstructedFlow::new(&domain, BodyForce { gx: 0.5, gy: -1. });

        let mut fields = random_fields(8, 7);
        let before = fields.p.clone();

        let force = policy.apply(&mut fields);
        assert_eq!(force, BodyForce { gx: 0.5, gy: -1. });

        for (i, j) in [(3, 3), (4, 3)] {
            assert_eq!(fields.u[0][(i, j)], 0.);
            assert_eq!(fields.u[1][(i, j)], 0.);
        }

        // (3, 3) has (4, 4), (2, 2), (2, 4) and (4, 2) free
        let expected =
            (before[(4, 4)] + before[(2, 2)] + before[(2, 4)] + before[(4, 2)]) / 4.;
        assert_eq!(fields.p[(3, 3)], expected);

        for field in fields.u.iter().chain(std::iter::once(&fields.p)) {
            for j in 0..7 {
                assert_eq!(field[(0, j)], field[(1, j)]);
                assert_eq!(field[(7, j)], field[(6, j)]);
            }
            for i in 1..7 {
                assert_eq!(field[(i, 0)], field[(i, 1)]);
                assert_eq!(field[(i, 6)], field[(i, 5)]);
            }
        }
    }

    #[test]
    fn test_enclosed_obstruction_keeps_pressure() {
        let block = (3..6).flat_map(|i| (3..6).map(move |j| (i, j)));
        let domain = Domain::new(9, 9, 0.1, block).unwrap();
        let policy = ObstructedFlow::new(&domain, BodyForce::default());

        let mut fields = random_fields(9, 9);
        let before = fields.p.clone();

        policy.apply(&mut fields);

        // every diagonal neighbour of the block centre is solid
        assert_eq!(fields.p[(4, 4)], before[(4, 4)]);
        assert_eq!(fields.u[0][(4, 4)], 0.);
        assert_eq!(fields.u[1][(4, 4)], 0.);

        // a block corner averages its three free diagonal neighbours
        let corner = (before[(2, 2)] + before[(2, 4)] + before[(4, 2)]) / 3.;
        assert_eq!(fields.p[(3, 3)], corner);
    }

    #[test]
    fn test_policies_keep_fields_finite() {
        let domain = Domain::new(9, 9, 0.1, (3..6).flat_map(|i| (3..6).map(move |j| (i, j))))
            .unwrap();

        let policies: Vec<Box<dyn BoundaryCondition>> = vec![
            BoundaryKind::ObstructedFlow { gx: 1., gy: 0. }.build(&domain),
            BoundaryKind::DrivenLid { lid_speed: 1. }.build(&domain),
            BoundaryKind::Channel { gx: 2. }.build(&domain),
        ];

        for policy in policies {
            let mut fields = random_fields(9, 9);
            let force = policy.apply(&mut fields);

            assert!(fields.is_finite(), "{} produced non-finite values", policy.name());
            assert!(force.gx.is_finite() && force.gy.is_finite());
        }
    }

    #[test]
    fn test_boundary_kind_serde() {
        let kind: BoundaryKind =
            serde_json::from_str(r#"{"kind": "driven-lid", "lid_speed": 2.0}"#).unwrap();
        assert_eq!(kind, BoundaryKind::DrivenLid { lid_speed: 2.0 });

        let json = serde_json::to_string(&BoundaryKind::Channel { gx: 0.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"channel","gx":0.5}"#);
    }
}

//! Line-element stiffness model of an extruded prism.
//!
//! The prism is idealised as a chain of 3D Euler-Bernoulli beam elements laid
//! along its centroidal axis, one element per sweep division. Each node carries
//! six degrees of freedom ordered `[ux, uy, uz, rx, ry, rz]` in part
//! coordinates. The system is solved with the direct stiffness method,
//! <https://en.wikipedia.org/wiki/Direct_stiffness_method>.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector, SMatrix, Vector3};
use thiserror::Error;

use crate::geometry::{Point, Point2, Profile};
use crate::materials::Elastic;

/// Degrees of freedom per node.
pub const DOF_PER_NODE: usize = 6;

/// Smallest accepted ratio between the extreme pivots of the reduced system.
const PIVOT_RATIO: f64 = 1.0e-13;

/// Error raised when a beam model cannot be solved.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BeamError {
    /// Returned when no degree of freedom is constrained.
    #[error("instance `{instance}` has no boundary condition and is unrestrained")]
    Unrestrained {
        /// Instance being solved.
        instance: String,
    },
    /// Returned when the constraints leave a rigid-body mode.
    #[error("stiffness of instance `{instance}` is singular; constraints leave a rigid-body mode")]
    Singular {
        /// Instance being solved.
        instance: String,
    },
}

/// Cross-section constants of a profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionProperties {
    /// Area.
    pub area: f64,
    /// Centroid in sketch coordinates.
    pub centroid: Point2,
    /// Second moment about the centroidal X axis.
    pub ixx: f64,
    /// Second moment about the centroidal Y axis.
    pub iyy: f64,
    /// Torsion constant, approximated by the polar moment.
    pub torsion: f64,
}

impl SectionProperties {
    /// Constants of `profile`. The product of area is neglected.
    #[must_use]
    pub fn of(profile: &Profile) -> Self {
        let moments = profile.second_moments();
        Self {
            area: profile.area(),
            centroid: profile.centroid(),
            ixx: moments.ixx,
            iyy: moments.iyy,
            torsion: moments.ixx + moments.iyy,
        }
    }
}

/// Beam idealisation of one instance.
#[derive(Clone, Debug)]
pub struct BeamModel {
    /// Instance the model stands for.
    instance: String,
    /// Cross-section constants.
    section: SectionProperties,
    /// Elastic constants.
    elastic: Elastic,
    /// Length along Z.
    depth: f64,
    /// Number of elements.
    elements: usize,
    /// Global nodal load vector.
    load: DVector<f64>,
    /// Prescribed value per constrained degree of freedom.
    prescribed: BTreeMap<usize, f64>,
}

impl BeamModel {
    /// Unloaded, unconstrained model with `elements` equal elements.
    #[must_use]
    pub fn new(
        instance: impl Into<String>,
        profile: &Profile,
        depth: f64,
        elastic: Elastic,
        elements: usize,
    ) -> Self {
        let elements = elements.max(1);
        Self {
            instance: instance.into(),
            section: SectionProperties::of(profile),
            elastic,
            depth,
            elements,
            load: DVector::zeros((elements + 1) * DOF_PER_NODE),
            prescribed: BTreeMap::new(),
        }
    }

    /// Cross-section constants.
    #[must_use]
    pub fn section(&self) -> &SectionProperties {
        &self.section
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.elements + 1
    }

    /// Index of the last node.
    #[must_use]
    pub fn last_node(&self) -> usize {
        self.elements
    }

    /// Length of each element.
    #[must_use]
    pub fn element_length(&self) -> f64 {
        self.depth / self.elements as f64
    }

    /// Position of `node` in part coordinates.
    #[must_use]
    pub fn node_position(&self, node: usize) -> Point {
        Point::new(
            self.section.centroid.x,
            self.section.centroid.y,
            node as f64 * self.element_length(),
        )
    }

    /// Node closest to height `z`.
    #[must_use]
    pub fn nearest_node(&self, z: f64) -> usize {
        let index = (z / self.element_length()).round();
        (index.max(0.0) as usize).min(self.last_node())
    }

    /// Add a force and moment at `node`.
    pub fn apply_nodal_load(&mut self, node: usize, force: Vector3<f64>, moment: Vector3<f64>) {
        let base = node * DOF_PER_NODE;
        for axis in 0..3 {
            self.load[base + axis] += force[axis];
            self.load[base + 3 + axis] += moment[axis];
        }
    }

    /// Add a uniform load per unit length along the whole axis: `force` acts
    /// in X, Y and Z, `torque` about Z.
    pub fn apply_line_load(&mut self, force: Vector3<f64>, torque: f64) {
        let l = self.element_length();
        for element in 0..self.elements {
            let a = element * DOF_PER_NODE;
            let b = a + DOF_PER_NODE;
            for (node, sign) in [(a, 1.0), (b, -1.0)] {
                self.load[node] += force.x * l / 2.0;
                self.load[node + 1] += force.y * l / 2.0;
                self.load[node + 2] += force.z * l / 2.0;
                // Fixed-end moments; rx opposes the y-z bending slope.
                self.load[node + 3] -= sign * force.y * l * l / 12.0;
                self.load[node + 4] += sign * force.x * l * l / 12.0;
                self.load[node + 5] += torque * l / 2.0;
            }
        }
    }

    /// Prescribe components at `node`; `None` leaves a component free.
    pub fn constrain(&mut self, node: usize, components: [Option<f64>; DOF_PER_NODE]) {
        let base = node * DOF_PER_NODE;
        for (offset, value) in components.into_iter().enumerate() {
            if let Some(value) = value {
                self.prescribed.insert(base + offset, value);
            }
        }
    }

    /// Prescribe components at every node.
    pub fn constrain_all(&mut self, components: [Option<f64>; DOF_PER_NODE]) {
        for node in 0..self.node_count() {
            self.constrain(node, components);
        }
    }

    /// Stiffness of one element in part coordinates.
    fn element_stiffness(&self) -> SMatrix<f64, 12, 12> {
        let l = self.element_length();
        let e = self.elastic.youngs_modulus;
        let g = self.elastic.shear_modulus();
        let mut k = SMatrix::<f64, 12, 12>::zeros();

        let axial = e * self.section.area / l;
        let torsion = g * self.section.torsion / l;
        for (dofs, stiffness) in [([2, 8], axial), ([5, 11], torsion)] {
            for (i, &row) in dofs.iter().enumerate() {
                for (j, &col) in dofs.iter().enumerate() {
                    k[(row, col)] += if i == j { stiffness } else { -stiffness };
                }
            }
        }

        let hermite = |inertia: f64| {
            let c = e * inertia / l.powi(3);
            c * SMatrix::<f64, 4, 4>::from_row_slice(&[
                12.0,
                6.0 * l,
                -12.0,
                6.0 * l,
                6.0 * l,
                4.0 * l * l,
                -6.0 * l,
                2.0 * l * l,
                -12.0,
                -6.0 * l,
                12.0,
                -6.0 * l,
                6.0 * l,
                2.0 * l * l,
                -6.0 * l,
                4.0 * l * l,
            ])
        };
        // Bending in x-z uses ry as the slope; bending in y-z uses -rx.
        let planes = [
            ([0, 4, 6, 10], [1.0, 1.0, 1.0, 1.0], hermite(self.section.iyy)),
            ([1, 3, 7, 9], [1.0, -1.0, 1.0, -1.0], hermite(self.section.ixx)),
        ];
        for (dofs, signs, local) in planes {
            for i in 0..4 {
                for j in 0..4 {
                    k[(dofs[i], dofs[j])] += signs[i] * signs[j] * local[(i, j)];
                }
            }
        }
        k
    }

    /// Assemble the global stiffness matrix.
    fn stiffness_matrix(&self) -> DMatrix<f64> {
        let dof = self.node_count() * DOF_PER_NODE;
        let mut matrix = DMatrix::zeros(dof, dof);
        let local = self.element_stiffness();
        for element in 0..self.elements {
            let base = element * DOF_PER_NODE;
            for row in 0..12 {
                for col in 0..12 {
                    matrix[(base + row, base + col)] += local[(row, col)];
                }
            }
        }
        matrix
    }

    /// Solve for nodal displacements and reactions.
    ///
    /// # Errors
    ///
    /// Returns [`BeamError::Unrestrained`] when nothing is constrained and
    /// [`BeamError::Singular`] when the constraints leave a mechanism.
    pub fn solve(&self) -> Result<BeamSolution, BeamError> {
        if self.prescribed.is_empty() {
            return Err(BeamError::Unrestrained {
                instance: self.instance.clone(),
            });
        }
        let stiffness = self.stiffness_matrix();
        let dof = stiffness.nrows();

        let mut displacements = DVector::zeros(dof);
        for (&index, &value) in &self.prescribed {
            displacements[index] = value;
        }
        let free: Vec<usize> = (0..dof)
            .filter(|index| !self.prescribed.contains_key(index))
            .collect();

        if !free.is_empty() {
            let mut k_ff = DMatrix::zeros(free.len(), free.len());
            let mut f_f = DVector::zeros(free.len());
            for (row_idx, &row) in free.iter().enumerate() {
                let coupling: f64 = self
                    .prescribed
                    .iter()
                    .map(|(&col, &value)| stiffness[(row, col)] * value)
                    .sum();
                f_f[row_idx] = self.load[row] - coupling;
                for (col_idx, &col) in free.iter().enumerate() {
                    k_ff[(row_idx, col_idx)] = stiffness[(row, col)];
                }
            }

            let lu = k_ff.lu();
            let pivots = lu.u().diagonal().map(f64::abs);
            if pivots.min() <= pivots.max() * PIVOT_RATIO {
                return Err(self.singular());
            }
            let solution = lu.solve(&f_f).ok_or_else(|| self.singular())?;
            for (idx, &index) in free.iter().enumerate() {
                displacements[index] = solution[idx];
            }
        }

        let reactions = &stiffness * &displacements - &self.load;
        let mut constrained = vec![false; dof];
        for &index in self.prescribed.keys() {
            constrained[index] = true;
        }
        Ok(BeamSolution {
            displacements,
            reactions,
            constrained,
        })
    }

    fn singular(&self) -> BeamError {
        BeamError::Singular {
            instance: self.instance.clone(),
        }
    }
}

/// Solved nodal state of a [`BeamModel`].
#[derive(Clone, Debug, PartialEq)]
pub struct BeamSolution {
    /// Displacement per degree of freedom.
    displacements: DVector<f64>,
    /// Reaction per degree of freedom; zero where unconstrained.
    reactions: DVector<f64>,
    /// Whether each degree of freedom is constrained.
    constrained: Vec<bool>,
}

impl BeamSolution {
    /// Translation of `node` in part coordinates.
    #[must_use]
    pub fn translation(&self, node: usize) -> Vector3<f64> {
        let base = node * DOF_PER_NODE;
        Vector3::new(
            self.displacements[base],
            self.displacements[base + 1],
            self.displacements[base + 2],
        )
    }

    /// Reaction force at `node`, if any of its degrees of freedom is constrained.
    #[must_use]
    pub fn reaction(&self, node: usize) -> Option<Vector3<f64>> {
        let base = node * DOF_PER_NODE;
        self.constrained[base..base + DOF_PER_NODE]
            .iter()
            .any(|&fixed| fixed)
            .then(|| {
                let pick = |offset: usize| {
                    if self.constrained[base + offset] {
                        self.reactions[base + offset]
                    } else {
                        0.0
                    }
                };
                Vector3::new(pick(0), pick(1), pick(2))
            })
    }
}

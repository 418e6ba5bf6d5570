extern crate nalgebra as na;
use na::{Matrix3, Vector3, Vector6};

/// Symmetric second-order tensor (stress or strain) at a field point.
///
/// Components are stored in the order of the field files:
/// `xx, yy, zz, xy, xz, yz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymTensor {
    matrix: Matrix3<f64>,
    vector: Vector6<f64>,
}

impl SymTensor {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        let vector = Self::matrix_to_vector(&matrix);
        SymTensor { matrix, vector }
    }

    pub fn from_components(components: [f64; 6]) -> Self {
        let vector = Vector6::from_row_slice(&components);
        SymTensor { matrix: Self::vector_to_matrix(&vector), vector }
    }

    // xx, yy, zz, xy, xz, yz
    fn matrix_to_vector(matrix: &Matrix3<f64>) -> Vector6<f64> {
        Vector6::new(
            matrix[(0, 0)],
            matrix[(1, 1)],
            matrix[(2, 2)],
            matrix[(0, 1)],
            matrix[(0, 2)],
            matrix[(1, 2)],
        )
    }

    fn vector_to_matrix(vector: &Vector6<f64>) -> Matrix3<f64> {
        Matrix3::new(
            vector[0], vector[3], vector[4],
            vector[3], vector[1], vector[5],
            vector[4], vector[5], vector[2],
        )
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn components(&self) -> &Vector6<f64> {
        &self.vector
    }

    pub fn xx(&self) -> f64 {
        self.vector[0]
    }

    /// Expresses the tensor in the frame rotated by `rotation`, `R^T T R`.
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> SymTensor {
        SymTensor::new(rotation.transpose() * self.matrix * rotation)
    }

    /// Eigenvalues sorted from largest to smallest.
    pub fn principal_values(&self) -> [f64; 3] {
        let mut values: Vec<f64> = self.matrix.symmetric_eigen().eigenvalues.iter().copied().collect();
        values.sort_by(|a, b| b.total_cmp(a));
        [values[0], values[1], values[2]]
    }
}

impl std::ops::Sub for SymTensor {
    type Output = SymTensor;

    fn sub(self, other: SymTensor) -> SymTensor {
        SymTensor::new(self.matrix - other.matrix)
    }
}

/// Composed rotation `Rx(angles.x) * Ry(angles.y) * Rz(angles.z)`.
///
/// `Ry` uses the `[[c, 0, -s], [0, 1, 0], [s, 0, c]]` sign convention.
pub fn euler_rotation(angles: &Vector3<f64>) -> Matrix3<f64> {
    let (sx, cx) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sz, cz) = angles[2].sin_cos();
    let rx = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cx, -sx,
        0.0, sx, cx,
    );
    let ry = Matrix3::new(
        cy, 0.0, -sy,
        0.0, 1.0, 0.0,
        sy, 0.0, cy,
    );
    let rz = Matrix3::new(
        cz, -sz, 0.0,
        sz, cz, 0.0,
        0.0, 0.0, 1.0,
    );
    rx * ry * rz
}

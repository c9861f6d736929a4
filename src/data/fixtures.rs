//! Small built-in graphs for demos and tests

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

use crate::matrix::SparseMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    /// Two triangles joined by a single edge
    TwoTriangles,
    Identity,
    AllOnes,
    Triangle,
}

impl Fixture {
    pub const ALL: [Fixture; 4] = [
        Fixture::TwoTriangles,
        Fixture::Identity,
        Fixture::AllOnes,
        Fixture::Triangle,
    ];

    pub fn matrix(self) -> SparseMatrix {
        match self {
            Fixture::TwoTriangles => SparseMatrix::from_dense(
                6,
                6,
                &[
                    0.0, 1.0, 1.0, 0.0, 0.0, 0.0, //
                    1.0, 0.0, 1.0, 0.0, 0.0, 0.0, //
                    1.0, 1.0, 0.0, 1.0, 0.0, 0.0, //
                    0.0, 0.0, 1.0, 0.0, 1.0, 1.0, //
                    0.0, 0.0, 0.0, 1.0, 0.0, 1.0, //
                    0.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
                ],
            ),
            Fixture::Identity => {
                SparseMatrix::from_dense(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
            }
            Fixture::AllOnes => SparseMatrix::from_dense(3, 3, &[1.0; 9]),
            Fixture::Triangle => {
                SparseMatrix::from_dense(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0])
            }
        }
    }

    /// Node labels `0..n`
    pub fn labels(self) -> Vec<String> {
        (0..self.matrix().cols()).map(|i| i.to_string()).collect()
    }
}

impl FromStr for Fixture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fixture::ALL
            .into_iter()
            .find(|fixture| fixture.to_string() == s)
            .ok_or_else(|| anyhow!("unknown fixture {:?}", s))
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fixture::TwoTriangles => "two-triangles",
            Fixture::Identity => "identity",
            Fixture::AllOnes => "all-ones",
            Fixture::Triangle => "triangle",
        };
        write!(f, "{}", name)
    }
}

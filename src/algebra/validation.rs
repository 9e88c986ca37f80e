//! Structural checks of a level ("check algebra").

use crate::algebra::level::{AlgebraLevel, MatrixId, VectorId};
use crate::algebra_error::AlgebraError;
use crate::debug_invariants::DebugInvariants;
use hashbrown::HashSet;

impl AlgebraLevel {
    fn check_vector_list(&self) -> Result<Vec<VectorId>, AlgebraError> {
        let forward: Vec<VectorId> = self.vectors().map(|(id, _)| id).collect();
        if forward.len() != self.vector_count() {
            return Err(AlgebraError::inconsistency(format!(
                "forward walk visits {} vectors, counter says {}",
                forward.len(),
                self.vector_count()
            )));
        }
        if self.vectors.len() != self.vector_count() {
            return Err(AlgebraError::inconsistency(format!(
                "{} live vector records, counter says {}",
                self.vectors.len(),
                self.vector_count()
            )));
        }
        let mut backward: Vec<VectorId> = self.vectors_rev().map(|(id, _)| id).collect();
        backward.reverse();
        if backward != forward {
            return Err(AlgebraError::inconsistency(
                "backward walk is not the reverse of the forward walk".to_string(),
            ));
        }
        Ok(forward)
    }

    fn check_adjacency(&self, v: VectorId) -> Result<usize, AlgebraError> {
        let rec = self.vector(v)?;
        if let Some(d) = rec.diag {
            let con = self
                .connection(d.connection())
                .ok_or_else(|| AlgebraError::inconsistency(format!("{v:?}: dangling diagonal")))?;
            if !con.is_diagonal() || con.matrices()[0].dest() != v {
                return Err(AlgebraError::inconsistency(format!(
                    "{v:?}: diagonal slot holds a non-diagonal entry"
                )));
            }
        }
        let mut dests = HashSet::new();
        let mut count = 0;
        for (m, mat) in self.off_diagonal(v) {
            count += 1;
            let dest = mat.dest();
            if dest == v {
                return Err(AlgebraError::inconsistency(format!(
                    "{v:?}: self coupling in off-diagonal list"
                )));
            }
            if !dests.insert(dest) {
                return Err(AlgebraError::inconsistency(format!(
                    "{v:?}: duplicate coupling to {dest:?}"
                )));
            }
            let adj = self
                .adjoint(m)
                .filter(|&adj| adj != m)
                .ok_or_else(|| AlgebraError::inconsistency(format!("{m:?}: missing adjoint")))?;
            if self.matrix_source(m) != Some(v) {
                return Err(AlgebraError::inconsistency(format!(
                    "{m:?}: adjoint does not point back to {v:?}"
                )));
            }
            if !self.off_diagonal(dest).any(|(other, _)| other == adj) {
                return Err(AlgebraError::inconsistency(format!(
                    "{adj:?}: reverse half not linked into {dest:?}"
                )));
            }
        }
        Ok(count)
    }

    /// Checks list integrity, connection symmetry and counters.
    pub fn check_algebra(&self) -> Result<(), AlgebraError> {
        let ids = self.check_vector_list()?;
        let mut matrices = 0;
        for &v in &ids {
            matrices += self.check_adjacency(v)?;
            if self.vector(v)?.diag.is_some() {
                matrices += 1;
            }
        }
        if matrices != self.matrix_count() {
            return Err(AlgebraError::inconsistency(format!(
                "{matrices} linked matrices, {} allocated",
                self.matrix_count()
            )));
        }
        Ok(())
    }

    /// `true` if `m` lives in the adjacency of `v` (diagonal included).
    pub fn owns_matrix(&self, v: VectorId, m: MatrixId) -> bool {
        self.adjacency(v).any(|(id, _)| id == m)
    }
}

impl DebugInvariants for AlgebraLevel {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "AlgebraLevel");
    }

    fn validate_invariants(&self) -> Result<(), AlgebraError> {
        self.check_algebra()
    }
}

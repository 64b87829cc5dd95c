//! Build settings.

/// Options controlling a canonicalization run.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Cache lowered subexpressions by node identity for the whole build.
    pub memoize: bool,
    /// Reject variables whose column ranges overlap.
    pub check_column_overlap: bool,
    /// Entries of `A` with magnitude at most this are dropped after summing.
    pub zero_tol: f64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            memoize: true,
            check_column_overlap: true,
            zero_tol: 0.0,
        }
    }
}

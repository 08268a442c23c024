//! Storage order and structure tags

/// Order in which a buffer is read by the factorization kernels
///
/// Element access and expressions always address buffers row-major; the layout
/// only tells the solver how to interpret the buffer it is handed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Consecutive elements of a row are adjacent
    #[default]
    RowMajor,
    /// Consecutive elements of a column are adjacent
    ColMajor,
}

/// Known structure of a matrix
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Structure {
    /// No assumption
    #[default]
    General,
    /// `a(r, c) == a(c, r)`; lets the solver pick Cholesky without checking
    Symmetric,
}

/// Layout plus structure of a matrix
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Format {
    /// Buffer order
    pub layout: Layout,
    /// Structure tag
    pub structure: Structure,
}

impl Format {
    /// Row-major general matrix
    pub const GENERAL: Self = Self {
        layout: Layout::RowMajor,
        structure: Structure::General,
    };

    /// Row-major symmetric matrix
    pub const SYMMETRIC: Self = Self {
        layout: Layout::RowMajor,
        structure: Structure::Symmetric,
    };

    /// Same structure, different layout
    pub const fn with_layout(self, layout: Layout) -> Self {
        Self {
            layout,
            structure: self.structure,
        }
    }

    /// Whether the symmetric tag is set
    #[inline]
    pub const fn is_symmetric(self) -> bool {
        matches!(self.structure, Structure::Symmetric)
    }
}

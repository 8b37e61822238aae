use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The rewriter was handed a function that is not a `Function` node or
    /// whose body carries no dataflow block.
    #[snafu(display("rewrite root must be a function with a SeqExpr body, got {kind}"))]
    NotARewritableFunction { kind: &'static str },

    /// The dataflow block handed to the rewriter is not part of the
    /// function body.
    #[snafu(display("dataflow block is not contained in the function body"))]
    BlockNotInFunction,

    /// Variable lookup inside the rewritten block failed.
    #[snafu(display("variable {name:?} is not defined in the dataflow block"))]
    VarNotFound { name: String },

    /// Removal of a variable that still has users.
    #[snafu(display("variable {name:?} still has {count} user(s)"))]
    VarHasUsers { name: String, count: usize },

    /// Module mutation could not locate the original function.
    #[snafu(display("module contains no function matching the rewritten one"))]
    OriginalFunctionNotFound,
}

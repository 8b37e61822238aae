use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Binding target must be a (dataflow) variable.
    #[snafu(display("binding target must be a variable, got {kind}"))]
    NotAVariable { kind: &'static str },

    /// Module entries must be functions.
    #[snafu(display("module entry {name:?} is not a function, got {kind}"))]
    NotAFunction { name: String, kind: &'static str },

    /// Function name already present in the module.
    #[snafu(display("module already contains a function named {name:?}"))]
    DuplicateFunction { name: String },
}

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum XPathError {
    /// The query text and what went wrong where.
    #[error("cannot parse XPath `{0}`: {1}")]
    XPathParse(String, String),

    #[error("{function}(): {message}")]
    FunctionError { function: String, message: String },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("variable ${0} is not bound")]
    UnknownVariable(String),

    #[error("prefix '{0}' is not bound to a namespace")]
    UnknownPrefix(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("malformed XML: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("failed to write XML: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialized document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// An edit that would break the tree, such as moving a node below itself.
    #[error("invalid tree edit: {0}")]
    Structure(String),
}

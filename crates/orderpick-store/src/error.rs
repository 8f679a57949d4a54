/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A merge or increment targeted a document that does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection path, e.g. `Users/p1/Orders`.
        collection: String,
        /// Document id within the collection.
        id: String,
    },

    /// An increment targeted a field that is not an integer.
    #[error("field {field} of {collection}/{id} is not an integer")]
    NotAnInteger {
        collection: String,
        id: String,
        field: String,
    },

    /// The backing service could not be reached or refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub mod auth;
pub mod delete;
pub mod health;
pub mod retrieve;
pub mod upload;

pub use auth::BasicAuth;
pub use delete::{Deleter, NewDeleterParam};
pub use health::{HealthService, HealthStatus, NewHealthServiceParam};
pub use retrieve::{NewRetrieverParam, RetrieveFileResult, Retriever};
pub use upload::{NewUploaderParam, UploadFileParam, UploadFileResult, Uploader};

pub mod recall;
pub mod similarity;
pub mod store;

pub use recall::{retrieve_relevant, should_update};
pub use similarity::{build_tf_vector, cosine_sim, tokenize, TfVector};
pub use store::{ConversationMeta, SqliteStore, CURRENT_SESSION_TITLE};

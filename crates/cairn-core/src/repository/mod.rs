//! Repository trait seams.
//!
//! Implementations live in `cairn-infra` (SQLite). Uses native async
//! fn in traits (RPITIT, Rust 2024 edition); services stay generic
//! over these so tests can substitute in-memory fakes.

use cairn_types::chat::{Conversation, StoredMessage};
use cairn_types::context::{DomainConfig, Insight, UserProfile};
use cairn_types::error::RepositoryError;
use uuid::Uuid;

/// Persistence for conversations.
pub trait ConversationRepository: Send + Sync {
    fn get(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Most-recent other conversations for a user, newest first,
    /// excluding `exclude` (the one currently in flight).
    fn recent_for_user(
        &self,
        user_id: &Uuid,
        exclude: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;
}

/// Persistence for chat messages. Messages are append-only.
pub trait MessageRepository: Send + Sync {
    fn save(
        &self,
        message: &StoredMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages of a conversation, ordered by creation time.
    fn for_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// The last `limit` messages of a conversation, oldest first.
    fn tail(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;
}

impl<T: ConversationRepository> ConversationRepository for std::sync::Arc<T> {
    async fn get(&self, conversation_id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        (**self).get(conversation_id).await
    }

    async fn recent_for_user(
        &self,
        user_id: &Uuid,
        exclude: &Uuid,
        limit: u32,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        (**self).recent_for_user(user_id, exclude, limit).await
    }
}

impl<T: MessageRepository> MessageRepository for std::sync::Arc<T> {
    async fn save(&self, message: &StoredMessage) -> Result<(), RepositoryError> {
        (**self).save(message).await
    }

    async fn for_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        (**self).for_conversation(conversation_id).await
    }

    async fn tail(
        &self,
        conversation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        (**self).tail(conversation_id, limit).await
    }
}

impl<T: ContextRepository> ContextRepository for std::sync::Arc<T> {
    async fn profile(&self, user_id: &Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        (**self).profile(user_id).await
    }

    async fn confirmed_insights(&self, user_id: &Uuid) -> Result<Vec<Insight>, RepositoryError> {
        (**self).confirmed_insights(user_id).await
    }

    async fn domain(&self, domain_id: &str) -> Result<Option<DomainConfig>, RepositoryError> {
        (**self).domain(domain_id).await
    }
}

/// Read access to the context sources the assembler fans out over.
pub trait ContextRepository: Send + Sync {
    fn profile(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>, RepositoryError>> + Send;

    fn confirmed_insights(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Insight>, RepositoryError>> + Send;

    fn domain(
        &self,
        domain_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<DomainConfig>, RepositoryError>> + Send;
}

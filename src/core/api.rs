//! Remote API abstraction

use super::error::Result;
use super::model::{
    AccountSnapshot, Credentials, FetchedDocument, SessionToken, SignedDocumentRef,
    TransactionalDocumentRef,
};
use async_trait::async_trait;

#[async_trait]
pub trait NaloApi: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken>;

    async fn list_signed_documents(&self, token: &SessionToken) -> Result<Vec<SignedDocumentRef>>;

    async fn fetch_signed_document(
        &self,
        token: &SessionToken,
        doc: &SignedDocumentRef,
    ) -> Result<FetchedDocument>;

    async fn list_transactional_documents(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<TransactionalDocumentRef>>;

    async fn fetch_transactional_document(
        &self,
        token: &SessionToken,
        doc: &TransactionalDocumentRef,
    ) -> Result<FetchedDocument>;

    async fn get_accounts(&self, token: &SessionToken) -> Result<Vec<AccountSnapshot>>;
}

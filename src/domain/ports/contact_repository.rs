use crate::domain::entities::Contact;
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait ContactRepository: Send + Sync {
    async fn get_contact_by_id(&self, id: &str) -> DomainResult<Option<Contact>>;
}

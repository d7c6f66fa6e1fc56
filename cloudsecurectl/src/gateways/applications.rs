use super::{list_all, Listing};
use crate::client::SessionClient;
use cloudsecure_core::api::ApplicationRecord;
use cloudsecure_core::Result;

const APPLICATIONS_PATH: &str = "applications";

/// Applications discovered in the tenant
pub struct ApplicationGateway<'a> {
    session: &'a SessionClient,
}

impl<'a> ApplicationGateway<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    pub async fn list(&self) -> Result<Listing<ApplicationRecord>> {
        list_all(self.session, APPLICATIONS_PATH).await
    }
}

use std::sync::Arc;

use crate::application::admin::MatchAdminService;
use crate::application::catalog::CatalogService;
use crate::application::remote::RemoteService;
use crate::application::votes::VoteService;
use crate::infra::db::SqliteRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub votes: Arc<VoteService>,
    pub catalog: Arc<CatalogService>,
    pub admin: Arc<MatchAdminService>,
    pub db: Arc<SqliteRepositories>,
    pub remote: Arc<dyn RemoteService>,
}

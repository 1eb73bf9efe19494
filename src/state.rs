use crate::db::database::Database;
use crate::services::poster::PosterClient;
use crate::services::shortener::LinkShortener;
use crate::utils::autodelete::DeleteQueue;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub deletes: DeleteQueue,
    pub shortener: LinkShortener,
    pub poster: PosterClient,
    /// Resolved once at startup; deep links embed it.
    pub bot_username: String,
}

impl AppState {
    pub fn new(
        db: Database,
        deletes: DeleteQueue,
        shortener: LinkShortener,
        poster: PosterClient,
        bot_username: String,
    ) -> Self {
        AppState {
            db,
            deletes,
            shortener,
            poster,
            bot_username,
        }
    }
}
